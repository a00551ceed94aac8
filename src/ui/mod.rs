pub mod input;
pub mod menu;
pub mod screen;
pub mod sprixel;
