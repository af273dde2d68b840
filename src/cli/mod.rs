pub mod leaderboard;
pub mod logo;
pub mod portfolio;
pub mod price;
pub mod setup;
pub mod ui;
