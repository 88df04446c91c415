// src/storage/mod.rs
pub mod memory;

pub use memory::{
    BotMemory, CooldownStore, Cooldowns, HighWaterMarkStore, InMemoryStore, JsonMemoryStore,
};
