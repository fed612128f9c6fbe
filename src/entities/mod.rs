//! SeaORM entity definitions

pub mod prelude;

pub mod channel_movies;
pub mod channel_shows;
pub mod channels;
pub mod episodes;
pub mod movies;
pub mod programs;
pub mod settings;
pub mod shows;
