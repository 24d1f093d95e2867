pub mod health;
pub mod inventory;
pub mod manual;
pub mod scan;
