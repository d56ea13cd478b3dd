//! Read-side queries over the graph mirror: the 2-hop relationship
//! neighborhood and the shared-track recommendation ranking.

mod neighborhood;
mod recommend;

pub use neighborhood::{neighborhood, Neighborhood, TrimmedEdge, TrimmedNode};
pub use recommend::{recommend, DEFAULT_RECOMMENDATION_LIMIT};
