#![allow(dead_code)]

pub mod notifier;
pub mod windows;
