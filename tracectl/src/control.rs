// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The tracing controller: a database of targets and the reloadable filter built from it.

use ordermap::OrderMap;
use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, Registry, filter::LevelFilter, prelude::*, reload};

use crate::display::TargetsByTag;
use crate::targets::TRACING_TARGETS;
use crate::trace_target;

trace_target!("tracectl", LevelFilter::INFO, &[]);

/// Special key of a config string setting the level of logs from undeclared targets.
pub const DEFAULT_KEY: &str = "default";
/// Special key of a config string setting the level of every declared target.
pub const ALL_KEY: &str = "all";

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum TraceCtlError {
    #[error("Invalid tracing config '{0}': expected tag=level")]
    Syntax(String),
    #[error("Invalid log level '{0}'")]
    InvalidLevel(String),
    #[error("Unknown tracing tag '{0}'")]
    UnknownTag(String),
}

/// The configuration of one tracing target.
#[derive(Debug, Clone)]
pub struct TargetCfg {
    pub target: &'static str,
    pub name: &'static str,
    pub level: LevelFilter,
    pub tags: Vec<&'static str>,
    pub custom: bool,
}

impl TargetCfg {
    fn new(
        target: &'static str,
        name: &'static str,
        level: LevelFilter,
        tags: &'static [&'static str],
        custom: bool,
    ) -> Self {
        // a target can always be addressed by its name
        let mut tags = tags.to_vec();
        if !tags.contains(&name) {
            tags.push(name);
        }
        Self {
            target,
            name,
            level,
            tags,
            custom,
        }
    }
}

#[derive(Debug)]
pub(crate) struct TargetCfgDb {
    pub(crate) default: LevelFilter,
    pub(crate) targets: OrderMap<&'static str, TargetCfg>,
    pub(crate) tags: OrderMap<&'static str, BTreeSet<&'static str>>,
}

impl TargetCfgDb {
    fn new(default: LevelFilter) -> Self {
        let mut db = Self {
            default,
            targets: OrderMap::new(),
            tags: OrderMap::new(),
        };
        for t in TRACING_TARGETS {
            db.register(TargetCfg::new(t.target, t.name, t.level, t.tags, t.custom));
        }
        db
    }
    fn register(&mut self, cfg: TargetCfg) {
        for tag in &cfg.tags {
            self.tags.entry(*tag).or_default().insert(cfg.target);
        }
        if let Some(previous) = self.targets.insert(cfg.target, cfg) {
            warn!("Tracing target {} declared more than once", previous.target);
        }
    }
    fn env_filter(&self) -> EnvFilter {
        let mut filter = EnvFilter::new(self.default.to_string());
        for t in self.targets.values() {
            match format!("{}={}", t.target, t.level).parse() {
                Ok(directive) => filter = filter.add_directive(directive),
                Err(e) => warn!("Skipping tracing target {}: {e}", t.target),
            }
        }
        filter
    }
    /// Set the level of every target carrying `tag`. Returns how many targets changed.
    fn set_tag_level(&mut self, tag: &str, level: LevelFilter) -> Result<usize, TraceCtlError> {
        let members = self
            .tags
            .get(tag)
            .ok_or_else(|| TraceCtlError::UnknownTag(tag.to_owned()))?;
        let mut changed = 0;
        for t in self
            .targets
            .values_mut()
            .filter(|t| members.contains(t.target))
        {
            if t.level != level {
                t.level = level;
                changed += 1;
            }
        }
        Ok(changed)
    }
    fn as_config_string(&self) -> String {
        let mut out = format!("{DEFAULT_KEY}={}", self.default);
        for t in self.targets.values() {
            out += &format!(",{}={}", t.name, t.level);
        }
        out
    }
}

/// Parse a comma-separated list of `tag=level`. Levels are off, error, warn, info, debug, trace.
fn parse_config(input: &str) -> Result<OrderMap<String, LevelFilter>, TraceCtlError> {
    let mut config = OrderMap::new();
    for item in input.split(',').map(str::trim).filter(|i| !i.is_empty()) {
        let (tag, level) = item
            .split_once('=')
            .ok_or_else(|| TraceCtlError::Syntax(item.to_owned()))?;
        let (tag, level) = (tag.trim(), level.trim());
        if tag.is_empty() {
            return Err(TraceCtlError::Syntax(item.to_owned()));
        }
        let level = LevelFilter::from_str(level)
            .map_err(|_| TraceCtlError::InvalidLevel(level.to_owned()))?;
        config.insert(tag.to_owned(), level);
    }
    Ok(config)
}

/// Runtime controller of the tracing targets of the process.
#[derive(Debug)]
pub struct TraceCtl {
    db: Mutex<TargetCfgDb>,
    reload: Option<reload::Handle<EnvFilter, Registry>>,
}

static TRACE_CTL: OnceLock<TraceCtl> = OnceLock::new();

/// Get the process-wide [`TraceCtl`], installing the tracing subscriber on first use.
pub fn get_trace_ctl() -> &'static TraceCtl {
    TRACE_CTL.get_or_init(TraceCtl::new)
}

impl TraceCtl {
    fn new() -> Self {
        let db = TargetCfgDb::new(LevelFilter::INFO);
        let (filter, handle) = reload::Layer::new(db.env_filter());
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_line_number(true)
            .with_target(true)
            .with_thread_names(true)
            .with_level(true);

        // someone else (e.g. a test harness) may own the global subscriber already
        let reload = match tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
        {
            Ok(()) => Some(handle),
            Err(e) => {
                warn!("Tracing subscriber not installed, levels will not be applied: {e}");
                None
            }
        };
        Self {
            db: Mutex::new(db),
            reload,
        }
    }

    fn lock(&self) -> MutexGuard<'_, TargetCfgDb> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply(&self, db: &TargetCfgDb) {
        if let Some(handle) = &self.reload
            && let Err(e) = handle.reload(db.env_filter())
        {
            warn!("Failed to reload tracing filter: {e}");
        }
    }

    /// Make sure the controller (and subscriber) exist.
    pub fn init() {
        get_trace_ctl();
    }

    /// Set the level of all targets tagged with `tag`.
    pub fn set_tag_level(&self, tag: &str, level: LevelFilter) -> Result<(), TraceCtlError> {
        let mut db = self.lock();
        let changed = db.set_tag_level(tag, level)?;
        if changed > 0 {
            self.apply(&db);
        }
        info!("Log level for tag '{tag}' set to {level} ({changed} targets changed)");
        Ok(())
    }

    /// Set the level of every declared target.
    pub fn set_level_all(&self, level: LevelFilter) {
        let mut db = self.lock();
        db.targets.values_mut().for_each(|t| t.level = level);
        self.apply(&db);
    }

    /// Set the level for logs of targets nobody declared.
    pub fn set_default_level(&self, level: LevelFilter) {
        let mut db = self.lock();
        if db.default != level {
            db.default = level;
            self.apply(&db);
            info!("Default log level set to {level}");
        }
    }

    #[must_use]
    pub fn default_level(&self) -> LevelFilter {
        self.lock().default
    }

    /// Fail on the first tag no target carries.
    pub fn check_tags(&self, tags: &[&str]) -> Result<(), TraceCtlError> {
        let db = self.lock();
        match tags.iter().find(|tag| !db.tags.contains_key(**tag)) {
            Some(unknown) => Err(TraceCtlError::UnknownTag((*unknown).to_owned())),
            None => Ok(()),
        }
    }

    /// Apply a config string like `default=warn,all=info,render=debug`.
    ///
    /// `default` and `all` are applied first, so that individual tags can override them.
    /// Nothing is changed if the string is malformed or names an unknown tag.
    pub fn setup_from_string(&self, input: &str) -> Result<(), TraceCtlError> {
        let config = parse_config(input)?;
        let tags: Vec<&str> = config
            .keys()
            .map(String::as_str)
            .filter(|k| *k != DEFAULT_KEY && *k != ALL_KEY)
            .collect();
        self.check_tags(&tags)?;

        if let Some(level) = config.get(DEFAULT_KEY) {
            self.set_default_level(*level);
        }
        if let Some(level) = config.get(ALL_KEY) {
            self.set_level_all(*level);
        }
        for tag in tags {
            if let Some(level) = config.get(tag) {
                self.set_tag_level(tag, *level)?;
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn target(&self, target: &str) -> Option<TargetCfg> {
        self.lock().targets.get(target).cloned()
    }

    #[must_use]
    pub fn targets_by_tag(&self, tag: &str) -> Vec<TargetCfg> {
        let db = self.lock();
        db.tags
            .get(tag)
            .map(|members| {
                db.targets
                    .values()
                    .filter(|t| members.contains(t.target))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    #[must_use]
    pub fn as_config_string(&self) -> String {
        self.lock().as_config_string()
    }

    /// Log the configuration, target by target.
    pub fn dump(&self) {
        let db = self.lock();
        info!("{db}");
    }

    /// Log the configuration, tag by tag.
    pub fn dump_targets_by_tag(&self) {
        let db = self.lock();
        info!("{}", TargetsByTag(&db));
    }
}
