// Composition root for the punch sync device agent.
//
// Responsibilities
// - Read config from environment.
// - Instantiate concrete infrastructure implementations.
// - Wire implementations into the sync coordinator and the inbound surfaces.
// - Spawn background workers (reachability probe loop, sync worker).

pub mod config;
pub mod graphql;
pub mod http;
pub mod state;
pub mod workers;
