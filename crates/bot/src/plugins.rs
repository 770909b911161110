use std::{path::Path, sync::Arc};

use crate::BotConfig;
use plugin_core::{CommandKind, Plugin, PluginRegistry, factory::PluginFactory};
use tracing::warn;

pub async fn build_registry(config: &BotConfig, plugins_dir: &Path) -> Arc<PluginRegistry> {
    // Plugins are stateless; one instance each is enough.
    let factories: [&dyn PluginFactory; 6] = [
        &plugin_profile::ProfilePlugin,
        &plugin_slot::SlotPlugin,
        &plugin_fortune::FortunePlugin,
        &plugin_keywords::KeywordsPlugin,
        &plugin_moderation::ModerationPlugin,
        &plugin_admin::AdminPlugin,
    ];

    // Configured specs first, so they win over the defaults.
    let mut specs = config.plugins.clone();
    for factory in &factories {
        factory.register_defaults(&mut specs);
    }

    let plugins: Vec<Arc<dyn Plugin>> = factories.iter().map(|f| f.build()).collect();

    let registry = Arc::new(PluginRegistry::new());
    for mut spec in specs {
        let Some(plugin) = plugins.iter().find(|p| p.id() == spec.id).map(Arc::clone) else {
            warn!("Unknown plugin ID: {}", spec.id);
            continue;
        };
        if let Some(file_cfg) = load_plugin_config(plugins_dir, &spec.id) {
            spec.config = merge_yaml(file_cfg, spec.config);
        }
        registry.register(spec, plugin).await;
    }

    for kind in CommandKind::ALL {
        if registry.entry_for(kind).await.is_none() {
            warn!(command = ?kind, "No plugin serves command");
        }
    }

    registry
}

/// One line per enabled plugin, sorted by id: `id [usages] help`.
pub async fn summary(registry: &PluginRegistry) -> Vec<String> {
    let mut entries = registry.entries().await;
    entries.retain(|(_, entry)| entry.spec.enabled);
    entries.sort_by(|(a, _), (b, _)| a.cmp(b));
    entries
        .into_iter()
        .map(|(id, entry)| {
            let usages: Vec<_> = entry.plugin.commands().iter().map(|k| k.usage()).collect();
            format!("{id} [{}] {}", usages.join(", "), entry.plugin.help())
        })
        .collect()
}

fn merge_yaml(file_cfg: serde_yaml::Value, spec_cfg: serde_yaml::Value) -> serde_yaml::Value {
    use serde_yaml::Value::{Mapping, Sequence};
    match (file_cfg, spec_cfg) {
        (Mapping(mut a), Mapping(b)) => {
            for (k, v_b) in b {
                match a.get_mut(&k) {
                    Some(v_a) => {
                        let merged = merge_yaml(v_a.clone(), v_b);
                        *v_a = merged;
                    }
                    None => {
                        a.insert(k, v_b);
                    }
                }
            }
            Mapping(a)
        }
        (Sequence(mut a), Sequence(b)) => {
            a.extend(b);
            Sequence(a)
        }
        (a, _b) => a,
    }
}

fn load_plugin_config(root: &Path, id: &str) -> Option<serde_yaml::Value> {
    let path = root.join(id).join("config.yaml");
    match std::fs::read_to_string(&path) {
        Ok(s) => match serde_yaml::from_str::<serde_yaml::Value>(&s) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(plugin = %id, file = %path.display(), error = %e, "Failed to parse plugin config YAML");
                None
            }
        },
        Err(e) => {
            if path.exists() {
                warn!(plugin = %id, file = %path.display(), error = %e, "Failed to read plugin config file");
            }
            None
        }
    }
}
