pub mod events;
pub mod interpret;
pub mod routing;
pub mod schema;
pub mod tiers;
