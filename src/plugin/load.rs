//! The `load` section: pull objects in by specifier.
//!
//! ```yaml
//! load:
//!   - hutch.beamline
//!   - hutch.scripts.py
//!   - hutch.devices.make_daq()
//! ```

use super::{Plugin, PluginType};
use crate::error::LoadResult;
use crate::info::Info;
use crate::object::ObjectGroup;
use crate::resolver::Resolver;

/// Resolves each listed specifier and merges the results.
///
/// A specifier that fails to resolve is logged and contributes nothing; the
/// rest of the list still loads. Later specifiers win on duplicate names.
#[derive(Debug)]
pub struct LoadPlugin {
    info: Info,
}

impl LoadPlugin {
    /// Section key this plugin is registered under by default.
    pub const SOURCE: &'static str = "load";
}

impl PluginType for LoadPlugin {
    fn new(info: Info) -> LoadResult<Self> {
        Ok(Self { info })
    }
}

impl Plugin for LoadPlugin {
    fn get_objects(&mut self, resolver: &Resolver<'_>) -> LoadResult<ObjectGroup> {
        let mut objs = ObjectGroup::new();
        for specifier in self.info.string_list()? {
            objs.extend(resolver.resolve_module(&specifier));
        }
        Ok(objs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadError;
    use crate::module::{Module, ModuleRegistry};
    use crate::object::Object;

    fn modules() -> ModuleRegistry {
        let beamline = Module::new("hutch.beamline")
            .with_value("sam_x", 1_i64)
            .with_value("sam_y", 2_i64);
        let devices = Module::new("hutch.devices")
            .with_function("make_daq", || Ok(Object::new("daq")));
        ModuleRegistry::new()
            .with_module(beamline)
            .with_module(devices)
    }

    #[test]
    fn loads_a_single_string() {
        let modules = modules();
        let mut plugin = LoadPlugin::new(Info::from("hutch.beamline")).unwrap();
        let objs = plugin.get_objects(&Resolver::new(&modules)).unwrap();
        assert_eq!(objs.keys().collect::<Vec<_>>(), vec!["sam_x", "sam_y"]);
    }

    #[test]
    fn loads_a_list_and_skips_failures() {
        let modules = modules();
        let yaml = "[hutch.beamline.py, missing.module, hutch.devices.make_daq()]";
        let info: Info = serde_yaml::from_str(yaml).unwrap();
        let mut plugin = LoadPlugin::new(info).unwrap();
        let objs = plugin.get_objects(&Resolver::new(&modules)).unwrap();

        assert_eq!(
            objs.keys().collect::<Vec<_>>(),
            vec!["sam_x", "sam_y", "make_daq"]
        );
        assert_eq!(
            objs["make_daq"].downcast_ref::<&'static str>(),
            Some(&"daq")
        );
    }

    #[test]
    fn mapping_payload_is_a_shape_error() {
        let modules = modules();
        let info: Info = serde_yaml::from_str("{a: b}").unwrap();
        let mut plugin = LoadPlugin::new(info).unwrap();
        assert!(matches!(
            plugin.get_objects(&Resolver::new(&modules)),
            Err(LoadError::ConfigShape { found: "mapping", .. })
        ));
    }
}
