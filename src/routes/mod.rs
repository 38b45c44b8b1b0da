pub mod mafia;
pub mod odd_one_in;
pub mod session;
pub mod table;
pub mod undercover;
pub mod util;
