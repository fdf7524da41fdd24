//! Content-addressed cache keys.
//!
//! A key is the SHA-256 of the diagram source and every resolved option,
//! rendered as `<namespace>/<first 2 hex>/<remaining hex>`. The two-character
//! shard keeps any single directory of the persistent tier small.

use std::{fmt, path::PathBuf};

use sha2::{Digest, Sha256};

use crate::domain::options::DiagramOptions;

pub const D2_NAMESPACE: &str = "diagrams/d2";
pub const GOAT_NAMESPACE: &str = "diagrams/goat";
const SHARD_LEN: usize = 2;
// Bump when the hashed layout changes so old entries are never reused.
const KEY_SCHEMA: &[u8] = b"diagram-cache/key/v1";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    namespace: &'static str,
    digest: String,
}

impl CacheKey {
    pub fn namespace(&self) -> &'static str {
        self.namespace
    }

    /// Full lowercase hex digest.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn shard(&self) -> &str {
        &self.digest[..SHARD_LEN]
    }

    pub fn leaf(&self) -> &str {
        &self.digest[SHARD_LEN..]
    }

    /// Location of the entry relative to a store root.
    pub fn relative_path(&self) -> PathBuf {
        let mut path: PathBuf = self.namespace.split('/').collect();
        path.push(self.shard());
        path.push(self.leaf());
        path
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.namespace, self.shard(), self.leaf())
    }
}

/// Derive the key for `source` rendered with `options`.
///
/// Pure: the same inputs produce the same key in every process. Each field is
/// written with its name and a length prefix so adjacent values cannot run
/// together.
pub fn build_key(source: &str, options: &DiagramOptions) -> CacheKey {
    let mut hasher = Sha256::new();
    hasher.update(KEY_SCHEMA);
    write_field(&mut hasher, "source", source.as_bytes());
    write_field(&mut hasher, "center", &[u8::from(options.center)]);
    write_field(&mut hasher, "dark_theme", options.dark_theme.as_bytes());
    write_field(&mut hasher, "layout_engine", options.layout_engine.as_bytes());
    write_field(&mut hasher, "light_theme", options.light_theme.as_bytes());
    write_field(&mut hasher, "minify", &[u8::from(options.minify)]);
    write_field(&mut hasher, "padding", &options.padding.to_le_bytes());
    write_field(&mut hasher, "salt", options.salt.as_bytes());
    write_field(&mut hasher, "scale", &options.scale.to_bits().to_le_bytes());
    write_field(&mut hasher, "sketch", &[u8::from(options.sketch)]);

    CacheKey {
        namespace: D2_NAMESPACE,
        digest: hex::encode(hasher.finalize()),
    }
}

/// Derive the key for ASCII-art `source`. Goat diagrams take no options.
pub fn build_goat_key(source: &str) -> CacheKey {
    let mut hasher = Sha256::new();
    hasher.update(KEY_SCHEMA);
    write_field(&mut hasher, "renderer", b"goat");
    write_field(&mut hasher, "source", source.as_bytes());

    CacheKey {
        namespace: GOAT_NAMESPACE,
        digest: hex::encode(hasher.finalize()),
    }
}

fn write_field(hasher: &mut Sha256, name: &str, value: &[u8]) {
    hasher.update(name.as_bytes());
    hasher.update((value.len() as u64).to_le_bytes());
    hasher.update(value);
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn identical_inputs_produce_identical_keys() {
        let options = DiagramOptions::default();
        assert_eq!(
            build_key("x -> y", &options),
            build_key("x -> y", &options.clone())
        );
    }

    #[test]
    fn key_has_namespace_shard_and_leaf() {
        let key = build_key("x -> y", &DiagramOptions::default());
        let rendered = key.to_string();

        assert!(rendered.starts_with("diagrams/d2/"), "{rendered}");
        assert_eq!(key.digest().len(), 64);
        assert_eq!(key.shard().len(), 2);
        assert_eq!(key.leaf().len(), 62);
        assert_eq!(
            rendered,
            format!("diagrams/d2/{}/{}", &key.digest()[..2], &key.digest()[2..])
        );
        assert_eq!(
            key.relative_path(),
            PathBuf::from("diagrams")
                .join("d2")
                .join(key.shard())
                .join(key.leaf())
        );
    }

    #[test]
    fn every_field_changes_the_key() {
        let base = DiagramOptions::default();
        let variants = vec![
            base.clone(),
            DiagramOptions {
                center: true,
                ..base.clone()
            },
            DiagramOptions {
                dark_theme: "Dark Mauve".to_string(),
                ..base.clone()
            },
            DiagramOptions {
                layout_engine: "elk".to_string(),
                ..base.clone()
            },
            DiagramOptions {
                light_theme: "Terminal".to_string(),
                ..base.clone()
            },
            DiagramOptions {
                minify: false,
                ..base.clone()
            },
            DiagramOptions {
                padding: 10,
                ..base.clone()
            },
            DiagramOptions {
                padding: 20,
                ..base.clone()
            },
            DiagramOptions {
                salt: "second".to_string(),
                ..base.clone()
            },
            DiagramOptions {
                scale: 1.5,
                ..base.clone()
            },
            DiagramOptions {
                scale: 0.75,
                ..base.clone()
            },
            DiagramOptions {
                sketch: true,
                ..base.clone()
            },
        ];

        let keys: HashSet<String> = variants
            .iter()
            .map(|options| build_key("x -> y", options).to_string())
            .collect();
        assert_eq!(keys.len(), variants.len());
    }

    #[test]
    fn source_changes_the_key() {
        let options = DiagramOptions::default();
        assert_ne!(build_key("x -> y", &options), build_key("x -> z", &options));
    }

    #[test]
    fn goat_keys_live_in_their_own_namespace() {
        let goat = build_goat_key("x -> y");
        let d2 = build_key("x -> y", &DiagramOptions::default());

        assert!(goat.to_string().starts_with("diagrams/goat/"), "{goat}");
        assert_ne!(goat.digest(), d2.digest());
        assert_eq!(goat, build_goat_key("x -> y"));
        assert_ne!(goat, build_goat_key("x -> z"));
    }

    #[test]
    fn field_boundaries_do_not_alias() {
        let a = DiagramOptions {
            dark_theme: "ab".to_string(),
            salt: "c".to_string(),
            ..Default::default()
        };
        let b = DiagramOptions {
            dark_theme: "a".to_string(),
            salt: "bc".to_string(),
            ..Default::default()
        };
        assert_ne!(build_key("x", &a), build_key("x", &b));
    }
}
