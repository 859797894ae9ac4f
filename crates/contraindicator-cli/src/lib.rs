//! contraindicator: command-line front end for the Contraindicator graph.
//!
//! Reads JSON payloads from stdin, runs one repository or resolver operation
//! against Neo4j and prints the JSON result on stdout.

pub mod commands;
pub mod config;
