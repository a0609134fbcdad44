use super::artifact::{Artifact, ArtifactDocument, ARTIFACT_VERSION};
use crate::error::{MapError, Result};

const COMPRESSION_LEVEL: i32 = 0;

/// An artifact ready to be written: the compressed bytes plus the JSON size.
#[derive(Debug, Clone)]
pub struct EncodedArtifact {
    pub original_size: u64,
    pub bytes: Vec<u8>,
}

pub fn encode<T: Artifact>(document: &ArtifactDocument<T>) -> Result<EncodedArtifact> {
    let json = serde_json::to_vec(document)?;
    let bytes = zstd::encode_all(&json[..], COMPRESSION_LEVEL)
        .map_err(|e| MapError::Compression(format!("zstd compression failed: {}", e)))?;
    Ok(EncodedArtifact {
        original_size: json.len() as u64,
        bytes,
    })
}

/// Any decompression, parse or version failure is reported as corruption of `T::NAME`.
pub fn decode<T: Artifact>(bytes: &[u8]) -> Result<ArtifactDocument<T>> {
    let corrupt = |reason: String| MapError::ArtifactCorrupt {
        name: T::NAME.to_string(),
        reason,
    };
    let json = zstd::decode_all(bytes).map_err(|e| corrupt(format!("decompression failed: {}", e)))?;
    let document: ArtifactDocument<T> =
        serde_json::from_slice(&json).map_err(|e| corrupt(format!("invalid document: {}", e)))?;
    if document.version != ARTIFACT_VERSION {
        return Err(corrupt(format!(
            "version {} (expected {})",
            document.version, ARTIFACT_VERSION
        )));
    }
    if document.map_type != T::NAME.as_str() {
        return Err(corrupt(format!("unexpected map type '{}'", document.map_type)));
    }
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::artifact::{ArtifactName, IssuesDoc, TreeDoc};
    use mapscope_api::DirectoryNode;

    #[test]
    fn test_document_survives_encoding() {
        let doc = ArtifactDocument::new(
            ArtifactName::Issues,
            42,
            IssuesDoc {
                violations: vec![],
                cycles: vec![],
                scan_issues: vec![],
                unresolved_imports: 3,
                ambiguous_pattern: true,
            },
        );
        let encoded = encode(&doc).unwrap();
        assert!(encoded.original_size > 0);
        let decoded: ArtifactDocument<IssuesDoc> = decode(&encoded.bytes).unwrap();
        assert_eq!(decoded, doc);
    }

    #[test]
    fn test_garbage_is_corrupt() {
        let err = decode::<IssuesDoc>(b"not zstd").unwrap_err();
        match err {
            MapError::ArtifactCorrupt { name, .. } => assert_eq!(name, "issues"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_wrong_map_type_is_corrupt() {
        let doc = ArtifactDocument::new(
            ArtifactName::Summary,
            1,
            TreeDoc {
                tree: DirectoryNode::default(),
            },
        );
        let encoded = encode(&doc).unwrap();
        assert!(matches!(
            decode::<TreeDoc>(&encoded.bytes),
            Err(MapError::ArtifactCorrupt { .. })
        ));
    }
}
