//! Fetching of the remote keys, and their merge into the local ones.

use std::path::{Path, PathBuf};

use futures::future::try_join_all;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::{
    config::{Local, Output},
    keys::{self, KeyTable},
    source::{self, Source, Target},
};

/// Inputs shorter than the shortest key type can't hold a key, and are skipped.
const MIN_KEYS_LEN: usize = "ssh-rsa".len();

/// The permissions of a newly created output file.
#[cfg(unix)]
const OUTPUT_MODE: u32 = 0o600;

/// An [`enum@Error`] aborting the aggregation of keys.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{}({}): {source}", target.provider(), target.identity())]
    Fetch {
        target: Target,
        source: source::Error,
    },

    #[error("{}({}): {source}", target.provider(), target.identity())]
    Parse { target: Target, source: keys::Error },

    #[error("Unable to read `{}`: {source}", path.display())]
    ReadLocal {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("`{}`: {source}", path.display())]
    ParseLocal { path: PathBuf, source: keys::Error },

    #[error("Unable to write the keys: {0}")]
    Write(#[source] std::io::Error),
}

/// Fetch the keys of every [`Target`] and merge them together, stamped with
/// their provenance.
///
/// Fetches happen concurrently, but the results are merged in the order of `targets`,
/// so that a key exported by multiple targets is attributed to the first one.
pub async fn fetch_remote(source: &impl Source, targets: &[Target]) -> Result<KeyTable, Error> {
    let fetched = try_join_all(targets.iter().map(|target| async move {
        source
            .fetch(target)
            .await
            .map_err(|source| Error::Fetch {
                target: target.clone(),
                source,
            })
    }))
    .await?;

    let mut keys = KeyTable::new();

    for (target, data) in targets.iter().zip(fetched) {
        if data.len() < MIN_KEYS_LEN {
            tracing::debug!("No keys found for `{target}`");
            continue;
        }

        let provenance = target.provenance();
        let mut remote = KeyTable::new();
        remote
            .parse_with(&data, |entry| entry.with_comment(provenance.as_str()))
            .map_err(|source| Error::Parse {
                target: target.clone(),
                source,
            })?;

        tracing::debug!("Fetched {} key(s) for `{target}`", remote.len());

        keys.merge(remote, false);
    }

    Ok(keys)
}

/// Read the [`Local`] keys, if any.
pub async fn load_local(local: &Local) -> Result<KeyTable, Error> {
    let mut keys = KeyTable::new();

    if let Local::File(path) = local {
        let data = tokio::fs::read(path)
            .await
            .map_err(|source| Error::ReadLocal {
                path: path.clone(),
                source,
            })?;

        keys.parse(&data).map_err(|source| Error::ParseLocal {
            path: path.clone(),
            source,
        })?;

        tracing::debug!("Loaded {} local key(s) from `{}`", keys.len(), path.display());
    }

    Ok(keys)
}

/// Merge the keys of the `targets` into the [`Local`] ones,
/// warning about already authorized keys if `warn` is set.
pub async fn aggregate(
    source: &impl Source,
    targets: &[Target],
    local: &Local,
    warn: bool,
) -> Result<KeyTable, Error> {
    let remote = fetch_remote(source, targets).await?;
    let mut keys = load_local(local).await?;

    let added = keys.merge(remote, warn);

    tracing::info!("Added {added} key(s), for a total of {}", keys.len());

    Ok(keys)
}

/// Write the `keys` to the [`Output`], replacing it's previous content.
pub async fn write(keys: &KeyTable, output: &Output) -> Result<(), Error> {
    let mut buffer = Vec::new();
    keys.write_to(&mut buffer).map_err(Error::Write)?;

    match output {
        Output::Stdout => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(&buffer).await.map_err(Error::Write)?;
            stdout.flush().await.map_err(Error::Write)
        }
        Output::File(path) => write_file(path, &buffer).await.map_err(Error::Write),
    }
}

async fn write_file(path: &Path, buffer: &[u8]) -> std::io::Result<()> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    options.mode(OUTPUT_MODE);

    let mut file = options.open(path).await?;
    file.write_all(buffer).await?;
    file.flush().await
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;

    use super::*;

    const K1: &str = "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIAcICQoLDA0ODxAREhMUFRYXGBkaGxwdHh8gISIjJCUm";
    const K2: &str = "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIA4PEBESExQVFhcYGRobHB0eHyAhIiMkJSYnKCkqKywt";
    const K3: &str = "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIBUWFxgZGhscHR4fICEiIyQlJicoKSorLC0uLzAxMjM0";

    /// A [`Source`] answering from memory, `None` simulating an unreachable identity.
    struct Fixed(HashMap<&'static str, Option<String>>);

    impl Fixed {
        fn new(responses: impl IntoIterator<Item = (&'static str, Option<String>)>) -> Self {
            Self(responses.into_iter().collect())
        }
    }

    #[async_trait]
    impl Source for Fixed {
        async fn fetch(&self, target: &Target) -> Result<Vec<u8>, source::Error> {
            match self.0.get(target.to_string().as_str()) {
                Some(Some(data)) => Ok(data.clone().into_bytes()),
                _ => Err(source::Error::Status {
                    url: target.url(),
                    status: reqwest::StatusCode::NOT_FOUND,
                }),
            }
        }
    }

    fn targets(targets: &[&str]) -> Vec<Target> {
        targets.iter().map(|t| t.parse().unwrap()).collect()
    }

    fn lines(keys: &KeyTable) -> Vec<String> {
        keys.iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn it_stamps_and_orders_remote_keys() {
        let source = Fixed::new([
            ("gh:alice", Some(format!("{K1} alice@laptop\n{K2}\n"))),
            ("gl:bob", Some(format!("{K3} bob\n{K1} bob\n"))),
        ]);

        let keys = fetch_remote(&source, &targets(&["gh:alice", "gl:bob"]))
            .await
            .unwrap();

        assert_eq!(
            lines(&keys),
            [
                format!("{K1} #ssh-get-id gh:alice"),
                format!("{K2} #ssh-get-id gh:alice"),
                format!("{K3} #ssh-get-id gl:bob"),
            ]
        );
    }

    #[tokio::test]
    async fn it_follows_the_argument_order() {
        let source = Fixed::new([
            ("gh:alice", Some(format!("{K1}\n"))),
            ("gl:bob", Some(format!("{K1}\n"))),
        ]);

        let keys = fetch_remote(&source, &targets(&["gl:bob", "gh:alice"]))
            .await
            .unwrap();

        assert_eq!(lines(&keys), [format!("{K1} #ssh-get-id gl:bob")]);
    }

    #[tokio::test]
    async fn it_skips_too_short_responses() {
        let source = Fixed::new([
            ("gh:alice", Some("\n".into())),
            ("gh:bob", Some(String::new())),
            ("lp:carol", Some(K2.to_string())),
        ]);

        let keys = fetch_remote(&source, &targets(&["gh:alice", "gh:bob", "lp:carol"]))
            .await
            .unwrap();

        assert_eq!(lines(&keys), [format!("{K2} #ssh-get-id lp:carol")]);
    }

    #[tokio::test]
    async fn it_fails_on_malformed_remote_keys() {
        let source = Fixed::new([
            ("gh:alice", Some(format!("{K1}\n"))),
            ("gh:mallory", Some(format!("{K2}\n<html>Not Found</html>\n"))),
        ]);

        let err = fetch_remote(&source, &targets(&["gh:alice", "gh:mallory"]))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Parse { .. }), "{err:?}");
        assert!(err.to_string().starts_with("gh(mallory): line 2:"), "{err}");
    }

    #[tokio::test]
    async fn it_fails_on_unreachable_targets() {
        let source = Fixed::new([("gh:alice", Some(format!("{K1}\n"))), ("gh:ghost", None)]);

        let err = fetch_remote(&source, &targets(&["gh:alice", "gh:ghost"]))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Fetch { .. }), "{err:?}");
        assert!(err.to_string().starts_with("gh(ghost): "), "{err}");
    }

    #[tokio::test]
    async fn it_merges_remote_keys_after_local_ones() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("authorized_keys");
        std::fs::write(&path, format!("{K1} laptop\n")).unwrap();

        let source = Fixed::new([("gh:alice", Some(format!("{K1} other\n{K2} desktop\n")))]);

        let keys = aggregate(&source, &targets(&["gh:alice"]), &Local::File(path), true)
            .await
            .unwrap();

        assert_eq!(
            lines(&keys),
            [format!("{K1} laptop"), format!("{K2} #ssh-get-id gh:alice")]
        );
    }

    #[tokio::test]
    async fn it_can_skip_local_keys() {
        let source = Fixed::new([("gh:alice", Some(format!("{K2}\n")))]);

        let keys = aggregate(&source, &targets(&["gh:alice"]), &Local::Skip, true)
            .await
            .unwrap();

        assert_eq!(lines(&keys), [format!("{K2} #ssh-get-id gh:alice")]);
    }

    #[tokio::test]
    async fn it_fails_on_missing_or_malformed_local_keys() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let malformed = dir.path().join("malformed");
        std::fs::write(&malformed, format!("{K1}\nssh-rsa\n")).unwrap();

        let source = Fixed::new([]);

        let err = load_local(&Local::File(missing)).await.unwrap_err();
        assert!(matches!(err, Error::ReadLocal { .. }), "{err:?}");

        let err = aggregate(&source, &[], &Local::File(malformed), true)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ParseLocal { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn it_replaces_the_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("authorized_keys");
        std::fs::write(&path, "a much longer previous content, to be truncated\n".repeat(8))
            .unwrap();

        let mut keys = KeyTable::new();
        keys.parse(format!("{K1} a\n{K2} b\n").as_bytes()).unwrap();

        write(&keys, &Output::File(path.clone())).await.unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            format!("{K1} a\n{K2} b\n")
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn it_creates_a_private_output_file() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("authorized_keys");

        write(&KeyTable::new(), &Output::File(path.clone()))
            .await
            .unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, OUTPUT_MODE);
        assert!(std::fs::read(&path).unwrap().is_empty());
    }
}
