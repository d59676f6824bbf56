pub mod issue;
pub mod table;
