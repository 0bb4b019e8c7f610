//! Verification module registry
//!
//! A fixed table of the verification engines this build knows about. The
//! registry is constructed by the caller (one per process) and passed by
//! reference; nothing is discovered at runtime.

use serde::{Deserialize, Serialize};

/// Verification engines implemented by this crate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Engine {
    BandTrace,
    ComboVerification,
}

/// Whether a module can run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ModuleState {
    Active { engine: Engine },
    NotImplemented { name: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInfo {
    pub id: String,
    pub display_name: String,
    pub description: String,
    #[serde(flatten)]
    pub state: ModuleState,
}

impl ModuleInfo {
    pub fn active(id: &str, display_name: &str, description: &str, engine: Engine) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            description: description.to_string(),
            state: ModuleState::Active { engine },
        }
    }

    pub fn placeholder(id: &str, display_name: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            description: description.to_string(),
            state: ModuleState::NotImplemented {
                name: display_name.to_string(),
            },
        }
    }

    pub fn engine(&self) -> Option<Engine> {
        match self.state {
            ModuleState::Active { engine } => Some(engine),
            ModuleState::NotImplemented { .. } => None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.engine().is_some()
    }
}

/// Registered modules in registration order
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    modules: Vec<ModuleInfo>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every module this build ships
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(ModuleInfo::active(
            "bands",
            "Band Tracer",
            "Trace each radio band through RFC, HW filter, carrier, generic and NV stages",
            Engine::BandTrace,
        ));
        registry.register(ModuleInfo::active(
            "combos",
            "Combos",
            "Compare CA/EN-DC combos across RFC, runtime table and UE capability",
            Engine::ComboVerification,
        ));
        registry.register(ModuleInfo::placeholder(
            "ims",
            "IMS Support",
            "Analyze IMS capability and configuration",
        ));
        registry.register(ModuleInfo::placeholder(
            "pics",
            "PICS",
            "Protocol Implementation Conformance Statement analysis",
        ));
        registry.register(ModuleInfo::placeholder(
            "supplementary_services",
            "Supp Services",
            "Analyze supplementary services (SS) configuration",
        ));
        registry
    }

    /// Register a module; a module with the same id is replaced in place
    pub fn register(&mut self, module: ModuleInfo) {
        match self.modules.iter_mut().find(|m| m.id == module.id) {
            Some(existing) => *existing = module,
            None => self.modules.push(module),
        }
    }

    pub fn get(&self, id: &str) -> Option<&ModuleInfo> {
        self.modules.iter().find(|m| m.id == id)
    }

    pub fn active(&self) -> impl Iterator<Item = &ModuleInfo> {
        self.modules.iter().filter(|m| m.is_active())
    }

    pub fn list(&self) -> &[ModuleInfo] {
        &self.modules
    }
}
