//! Process configuration and the execution context built from it.

use crate::{Result, TileError};

const ENV_TILE_SIZE: &str = "TILEWORK_TILE_SIZE";
const ENV_INNER_BLOCK: &str = "TILEWORK_INNER_BLOCK";
const ENV_NUM_THREADS: &str = "TILEWORK_NUM_THREADS";

/// Tiling and threading parameters.
///
/// A `Config` is validated once when the [`Context`] is built, and stays fixed for the lifetime
/// of that context.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct Config {
    /// Tile height and width used by the drivers.
    pub tile_size: usize,
    /// Inner blocking size of the panel factorizations.
    pub inner_block: usize,
    /// Number of worker threads. `0` uses one worker per available core.
    pub num_threads: usize,
}

impl Default for Config {
    #[inline]
    fn default() -> Self {
        Self {
            tile_size: 256,
            inner_block: 64,
            num_threads: 0,
        }
    }
}

impl Config {
    #[inline]
    pub fn with_tile_size(mut self, tile_size: usize) -> Self {
        self.tile_size = tile_size;
        self
    }

    #[inline]
    pub fn with_inner_block(mut self, inner_block: usize) -> Self {
        self.inner_block = inner_block;
        self
    }

    #[inline]
    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads;
        self
    }

    /// Reads `TILEWORK_TILE_SIZE`, `TILEWORK_INNER_BLOCK` and `TILEWORK_NUM_THREADS`, falling
    /// back to the defaults for unset variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let parse = |key: &str, default: usize| -> Result<usize> {
            match lookup(key) {
                None => Ok(default),
                Some(value) => value.trim().parse::<usize>().map_err(|_| {
                    TileError::config(format!("{key} must be a non-negative integer, got {value:?}"))
                }),
            }
        };

        let default = Self::default();
        let config = Self {
            tile_size: parse(ENV_TILE_SIZE, default.tile_size)?,
            inner_block: parse(ENV_INNER_BLOCK, default.inner_block)?,
            num_threads: parse(ENV_NUM_THREADS, default.num_threads)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tile_size == 0 {
            return Err(TileError::config("tile size must be positive"));
        }
        if self.inner_block == 0 {
            return Err(TileError::config("inner blocking size must be positive"));
        }
        if self.inner_block > self.tile_size {
            return Err(TileError::config(format!(
                "inner blocking size {} exceeds the tile size {}",
                self.inner_block, self.tile_size
            )));
        }
        Ok(())
    }
}

/// Validated configuration together with the worker pool executing scheduling regions.
///
/// Built once and passed by reference to every entry point.
pub struct Context {
    config: Config,
    pub(crate) pool: rayon::ThreadPool,
}

impl core::fmt::Debug for Context {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Context")
            .field("config", &self.config)
            .field("workers", &self.num_workers())
            .finish()
    }
}

impl Context {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.num_threads)
            .thread_name(|idx| format!("tilework-{idx}"))
            .build()
            .map_err(|err| TileError::NotInitialized {
                reason: err.to_string(),
            })?;

        log::debug!(
            target: "tilework",
            "context ready: tile size {}, inner block {}, {} workers",
            config.tile_size,
            config.inner_block,
            pool.current_num_threads(),
        );

        Ok(Self { config, pool })
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn tile_size(&self) -> usize {
        self.config.tile_size
    }

    #[inline]
    pub fn inner_block(&self) -> usize {
        self.config.inner_block
    }

    #[inline]
    pub fn num_workers(&self) -> usize {
        self.pool.current_num_threads()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tile_size, 256);
        assert_eq!(config.inner_block, 64);
    }

    #[test]
    fn rejects_bad_sizes() {
        assert!(matches!(
            Config::default().with_tile_size(0).validate(),
            Err(TileError::Config { .. })
        ));
        assert!(matches!(
            Config::default().with_inner_block(0).validate(),
            Err(TileError::Config { .. })
        ));
        assert!(matches!(
            Config::default()
                .with_tile_size(8)
                .with_inner_block(16)
                .validate(),
            Err(TileError::Config { .. })
        ));
    }

    #[test]
    fn reads_overrides() {
        let vars: HashMap<&str, &str> = [(ENV_TILE_SIZE, "128"), (ENV_NUM_THREADS, " 3 ")]
            .into_iter()
            .collect();
        let config = Config::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(config, Config::default().with_tile_size(128).with_num_threads(3));

        let vars: HashMap<&str, &str> = [(ENV_INNER_BLOCK, "many")].into_iter().collect();
        assert!(Config::from_lookup(|key| vars.get(key).map(|v| v.to_string())).is_err());
    }

    #[test]
    fn context_uses_requested_workers() {
        let ctx = Context::new(
            Config::default()
                .with_tile_size(4)
                .with_inner_block(2)
                .with_num_threads(2),
        )
        .unwrap();
        assert_eq!(ctx.num_workers(), 2);
        assert_eq!(ctx.tile_size(), 4);
        assert_eq!(ctx.inner_block(), 2);
    }
}
