use std::collections::BTreeMap;

/// Prefix Drone puts in front of every plugin setting.
pub const PLUGIN_PREFIX: &str = "PLUGIN_";

/// Key-sorted snapshot of the plugin settings, addressed by logical name
/// (`ACTION`, `SERVICE`, `ENV_SECRET_API_KEY`, ...).
///
/// Absent keys read as the empty string, so "unset" and "set but empty"
/// are indistinguishable, the way CI systems pass settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginEnv {
    vars: BTreeMap<String, String>,
}

impl PluginEnv {
    /// Translate raw process variables into logical keys.
    ///
    /// - `PLUGIN_<NAME>` becomes `<NAME>`
    /// - a bare `TOKEN` becomes `RAW_TOKEN` (pre-1.0 Drone secret injection)
    /// - `DRONE_WORKSPACE` becomes `WORKSPACE`
    ///
    /// Everything else is dropped.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut env = Self::default();
        for (key, value) in vars {
            let key = key.into();
            let logical = if let Some(name) = key.strip_prefix(PLUGIN_PREFIX) {
                name.to_owned()
            } else {
                match key.as_str() {
                    "TOKEN" => "RAW_TOKEN".to_owned(),
                    "DRONE_WORKSPACE" => "WORKSPACE".to_owned(),
                    _ => continue,
                }
            };
            env.vars.insert(logical, value.into());
        }
        env
    }

    /// Value for `key`, or `""` when unset.
    pub fn get(&self, key: &str) -> &str {
        self.vars.get(key).map_or("", String::as_str)
    }

    /// First non-empty value among `keys`, or `""`.
    pub fn get_first(&self, keys: &[&str]) -> &str {
        keys.iter()
            .map(|k| self.get(k))
            .find(|v| !v.is_empty())
            .unwrap_or("")
    }

    /// `Some(value)` when `key` is set to a non-empty value.
    pub fn get_opt(&self, key: &str) -> Option<String> {
        Some(self.get(key))
            .filter(|v| !v.is_empty())
            .map(str::to_owned)
    }

    /// Entries whose key starts with `prefix`, yielded as
    /// `(key without prefix, value)` in key order.
    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.vars
            .range(prefix.to_owned()..)
            .map_while(move |(k, v)| k.strip_prefix(prefix).map(|name| (name, v.as_str())))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PluginEnv {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
