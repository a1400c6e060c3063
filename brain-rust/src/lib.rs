//! LineScout on-board navigation brain.
//!
//! Fuses vehicle events arriving over a framed UART link with a weighted
//! waypoint graph, plans least-cost paths, and issues the motion commands
//! that steer the vehicle from START to a chosen end node.

pub mod actor;
pub mod algorithm;
pub mod competition;
pub mod constants;
pub mod demo;
pub mod engine;
pub mod heading;
pub mod listener;
pub mod mission_log;
pub mod network;
pub mod pathfinder;
pub mod uart;
pub mod vision;
pub mod web;
