pub mod client;
pub mod models;

pub use client::ApiClient;
pub use models::{
    pick_best_magnet, BatchMovieResult, BatchMoviesResponse, HistoryEntry, MagnetQuery, MagnetRef,
    Movie, MovieDetail, MovieListing, MovieQuery, Pagination, ProviderResponse,
};
