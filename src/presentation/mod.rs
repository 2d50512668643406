pub mod article;
pub mod assets;
pub mod blocks;
pub mod views;
