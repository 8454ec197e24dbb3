//! Sentence-embedding models the embedding backend knows how to fetch.

/// Built-in embedding models, downloaded on first use by the `ModelManager`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinModel {
    /// all-MiniLM-L6-v2 exported to ONNX
    MiniLM,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelCharacteristics {
    pub embedding_size: usize,
    pub max_sequence_length: usize,
    pub model_size_mb: usize,
}

/// Where a model's files live and what they must hash to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadInfo {
    pub name: String,
    pub model_url: String,
    pub tokenizer_url: String,
    pub model_hash: String,
    pub tokenizer_hash: String,
}

impl BuiltinModel {
    pub fn characteristics(&self) -> ModelCharacteristics {
        match self {
            BuiltinModel::MiniLM => ModelCharacteristics {
                embedding_size: 384,
                max_sequence_length: 256,
                model_size_mb: 85,
            },
        }
    }

    pub fn download_info(&self) -> DownloadInfo {
        match self {
            BuiltinModel::MiniLM => DownloadInfo {
                name: "minilm".to_string(),
                model_url: "https://huggingface.co/axar-ai/minilm/resolve/main/model.onnx".to_string(),
                tokenizer_url: "https://huggingface.co/axar-ai/minilm/resolve/main/tokenizer.json"
                    .to_string(),
                model_hash: "37f1ea074b7166e87295fce31299287d5fb79f76b8b7227fccc8a9f2f1ba4e16"
                    .to_string(),
                tokenizer_hash: "da0e79933b9ed51798a3ae27893d3c5fa4a201126cef75586296df9b4d2c62a0"
                    .to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_model_characteristics() {
        let characteristics = BuiltinModel::MiniLM.characteristics();
        assert_eq!(characteristics.embedding_size, 384);
        assert_eq!(characteristics.max_sequence_length, 256);
        assert_eq!(characteristics.model_size_mb, 85);
    }

    #[test]
    fn test_download_info_hashes_are_sha256_hex() {
        let info = BuiltinModel::MiniLM.download_info();
        for hash in [&info.model_hash, &info.tokenizer_hash] {
            assert_eq!(hash.len(), 64);
            assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        }
    }
}
