/// Itinerary engine: journal, playback, lighting, statistics
pub mod animator;
pub mod clustering;
pub mod geocoder;
pub mod itinerary;
pub mod playback;
pub mod solar;
pub mod stats;
pub mod timeline;
