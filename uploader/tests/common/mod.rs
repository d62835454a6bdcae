//! Common test utilities and infrastructure

#![allow(dead_code)]

pub mod fakes;
pub mod fixtures;
pub mod helpers;

pub use fakes::{FakeAdPlatform, InMemorySheet, RecordingNotifier};
pub use fixtures::{RowBuilder, TestFixtures};
pub use helpers::{TestHelpers, UploaderBuilder};
