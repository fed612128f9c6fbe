pub use super::channel_movies::Entity as ChannelMovies;
pub use super::channel_shows::Entity as ChannelShows;
pub use super::channels::Entity as Channels;
pub use super::episodes::Entity as Episodes;
pub use super::movies::Entity as Movies;
pub use super::programs::Entity as Programs;
pub use super::settings::Entity as Settings;
pub use super::shows::Entity as Shows;
