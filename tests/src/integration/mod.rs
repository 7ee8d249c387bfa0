//! # Integration Flows
//!
//! Every flow runs against real services wired over one in-memory store,
//! one bus and a manual clock. Only the validator decision sources are
//! scripted so outcomes are known in advance:
//!
//! - stake: validators named `no-*` reject, everyone else approves
//! - research: the quality score is the number in the researcher id (`r82`)

#[cfg(test)]
pub(crate) mod harness;

#[cfg(test)]
mod consensus_scenarios;
#[cfg(test)]
mod finality_flow;
#[cfg(test)]
mod integrity;
#[cfg(test)]
mod mining_lifecycle;
#[cfg(test)]
mod node_surface;
