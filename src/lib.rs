//! # Chat Rooms Library
//!
//! Multi-room chat backend. Users join and leave rooms and post messages;
//! every room keeps a monotonic version, a cached member count and a pointer
//! to its newest message, all kept consistent under concurrent writers.
//!
//! ## Architecture
//!
//! - **Domain Layer**: Room, Membership, Message entities and storage traits
//! - **Application Layer**: Room coordinator, room service and DTOs
//! - **Infrastructure Layer**: In-memory and PostgreSQL stores, metrics
//! - **Presentation Layer**: HTTP handlers and middleware
//!
//! ## Module Structure
//!
//! ```text
//! chat_rooms/
//! +-- config/         Configuration management
//! +-- domain/         Entities and storage traits
//! +-- application/    Services and DTOs
//! +-- infrastructure/ Stores, database, metrics
//! +-- presentation/   HTTP routes and middleware
//! +-- shared/         Common utilities (errors, snowflake IDs)
//! ```

// Configuration module
pub mod config;

// Domain layer - Core business logic
pub mod domain;

// Application layer - Business services
pub mod application;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Presentation layer - HTTP handlers
pub mod presentation;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;
