pub mod department;
pub mod interview;
pub mod question;
pub mod user;
