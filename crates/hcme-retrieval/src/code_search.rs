//! Code Searcher (spec §4.9): a semantic path over the scope-embedding
//! index, type-boosted and character-budgeted, with an LLM-guided fallback
//! for projects that aren't indexed or whose locks are held.

use crate::confidence::ConfidenceTiers;
use crate::error::Result;
use async_trait::async_trait;
use hcme_providers::{BrainRegistry, EmbeddingProvider, FileToolbox, GraphStore, ProjectInfo, VectorIndex};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct CodeSearchOptions {
    pub working_dir: String,
    pub initial_limit: usize,
    pub min_score: f32,
    pub char_budget: usize,
}

#[derive(Debug, Clone)]
pub struct CodeHit {
    pub file: String,
    pub start_line: u32,
    pub end_line: u32,
    pub source: String,
    pub score: f32,
    pub confidence: f32,
}

/// A coarse summary of a directory's contents, handed to the LLM-guided
/// fallback so it can decide which tools to reach for first.
#[derive(Debug, Clone, Default)]
pub struct DirectoryComposition {
    pub code_file_count: usize,
    pub document_file_count: usize,
    pub dominant_extensions: Vec<String>,
}

const CODE_EXTENSIONS: &[&str] = &[
    "rs", "ts", "tsx", "js", "jsx", "py", "go", "java", "c", "cc", "cpp", "h", "hpp", "rb", "cs",
];
const DOCUMENT_EXTENSIONS: &[&str] = &["md", "txt", "rst", "adoc"];

/// The LLM-guided fallback mini-agent (spec §4.9): one round of parallel
/// tool calls over `{brain_search, grep_files, list_directory, glob_files}`,
/// deduped by `(file, start_line)`. Mechanics of driving the LLM live in the
/// Structured LLM Executor; this trait is the Code Searcher's seam into it.
#[async_trait]
pub trait CodeSearchFallback: Send + Sync {
    async fn search(&self, query: &str, composition: &DirectoryComposition) -> Result<Vec<CodeHit>>;
}

pub async fn search_code(
    store: &dyn GraphStore,
    embedder: Option<&dyn EmbeddingProvider>,
    registry: &dyn BrainRegistry,
    file_toolbox: &dyn FileToolbox,
    fallback: &dyn CodeSearchFallback,
    query: &str,
    options: &CodeSearchOptions,
    tiers: &ConfidenceTiers,
) -> Result<Vec<CodeHit>> {
    if let Some(project) = resolve_project(registry, &options.working_dir).await? {
        let ingestion_lock = registry.get_ingestion_lock();
        let embedding_lock = registry.get_embedding_lock();
        if !ingestion_lock.is_locked() && !embedding_lock.is_locked() {
            if let Some(embedder) = embedder {
                if let Ok(vector) = embedder.embed_single(query).await {
                    return semantic_code_search(store, &project, &vector, options, tiers).await;
                }
            }
        }
    }

    let composition = compute_directory_composition(file_toolbox, &options.working_dir).await;
    let hits = fallback.search(query, &composition).await?;
    Ok(cap_by_char_budget(hits, options.char_budget))
}

/// A working directory qualifies when it is the project root itself, a
/// subdirectory of it, or an ancestor that contains it (spec §4.9).
async fn resolve_project(registry: &dyn BrainRegistry, working_dir: &str) -> Result<Option<ProjectInfo>> {
    if let Some(project) = registry.find_project_by_path(working_dir).await? {
        return Ok(Some(project));
    }
    let projects = registry.list_projects().await?;
    Ok(projects
        .into_iter()
        .find(|p| working_dir.starts_with(&p.path) || p.path.starts_with(working_dir)))
}

async fn semantic_code_search(
    store: &dyn GraphStore,
    _project: &ProjectInfo,
    vector: &[f32],
    options: &CodeSearchOptions,
    tiers: &ConfidenceTiers,
) -> Result<Vec<CodeHit>> {
    let top_k = 3 * options.initial_limit;
    let matches = store
        .vector_query(None, VectorIndex::ScopeEmbeddingContent, vector, top_k, None)
        .await?;
    let ids: Vec<String> = matches.iter().map(|m| m.uuid.clone()).collect();
    let units = store.get_code_units(&ids).await?;
    let score_by_id: HashMap<&str, f32> = matches.iter().map(|m| (m.uuid.as_str(), m.score)).collect();

    let mut hits: Vec<CodeHit> = units
        .into_iter()
        .filter(|unit| unit.file.starts_with(&options.working_dir))
        .filter_map(|unit| {
            let base_score = *score_by_id.get(unit.uuid.as_str())?;
            let boosted = (base_score * unit.unit_type.boost()).min(1.0);
            if boosted < options.min_score {
                return None;
            }
            Some(CodeHit {
                file: unit.file,
                start_line: unit.start_line,
                end_line: unit.end_line,
                source: unit.source,
                score: boosted,
                confidence: tiers.code_semantic,
            })
        })
        .collect();

    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    hits.truncate(options.initial_limit);
    Ok(cap_by_char_budget(hits, options.char_budget))
}

async fn compute_directory_composition(file_toolbox: &dyn FileToolbox, path: &str) -> DirectoryComposition {
    let Ok(entries) = file_toolbox.list_directory(path).await else {
        return DirectoryComposition::default();
    };

    let mut composition = DirectoryComposition::default();
    let mut extension_counts: HashMap<String, usize> = HashMap::new();

    for entry in &entries {
        let Some(ext) = entry.rsplit('.').next().map(str::to_lowercase) else {
            continue;
        };
        if ext == *entry {
            continue;
        }
        if CODE_EXTENSIONS.contains(&ext.as_str()) {
            composition.code_file_count += 1;
        } else if DOCUMENT_EXTENSIONS.contains(&ext.as_str()) {
            composition.document_file_count += 1;
        }
        *extension_counts.entry(ext).or_insert(0) += 1;
    }

    let mut ranked: Vec<(String, usize)> = extension_counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    composition.dominant_extensions = ranked.into_iter().take(5).map(|(ext, _)| ext).collect();
    composition
}

fn cap_by_char_budget(hits: Vec<CodeHit>, char_budget: usize) -> Vec<CodeHit> {
    let mut kept = Vec::new();
    let mut used = 0usize;
    for hit in hits {
        let size = hit.source.len();
        if used > 0 && used + size > char_budget {
            break;
        }
        used += size;
        kept.push(hit);
        if used >= char_budget {
            break;
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use hcme_providers::{AdvisoryLock, CodeUnit, CodeUnitType, GrepMatch, VectorMatch};
    use std::time::Duration;

    struct OpenLock;

    #[async_trait]
    impl AdvisoryLock for OpenLock {
        fn is_locked(&self) -> bool {
            false
        }
        async fn wait_for_unlock(&self, _timeout: Duration) -> hcme_providers::Result<()> {
            Ok(())
        }
    }

    struct HeldLock;

    #[async_trait]
    impl AdvisoryLock for HeldLock {
        fn is_locked(&self) -> bool {
            true
        }
        async fn wait_for_unlock(&self, _timeout: Duration) -> hcme_providers::Result<()> {
            Ok(())
        }
    }

    struct FakeRegistry {
        project: Option<ProjectInfo>,
        ingestion_locked: bool,
    }

    #[async_trait]
    impl BrainRegistry for FakeRegistry {
        async fn list_projects(&self) -> hcme_providers::Result<Vec<ProjectInfo>> {
            Ok(self.project.iter().cloned().collect())
        }
        async fn find_project_by_path(&self, path: &str) -> hcme_providers::Result<Option<ProjectInfo>> {
            Ok(self
                .project
                .clone()
                .filter(|p| path.starts_with(&p.path) || p.path.starts_with(path)))
        }
        fn get_ingestion_lock(&self) -> Box<dyn AdvisoryLock> {
            if self.ingestion_locked {
                Box::new(HeldLock)
            } else {
                Box::new(OpenLock)
            }
        }
        fn get_embedding_lock(&self) -> Box<dyn AdvisoryLock> {
            Box::new(OpenLock)
        }
    }

    struct FakeStore {
        units: Vec<CodeUnit>,
    }

    #[async_trait]
    impl GraphStore for FakeStore {
        async fn create_conversation(&self, _c: &hcme_types::Conversation) -> hcme_providers::Result<()> {
            Ok(())
        }
        async fn get_conversation(&self, _id: &str) -> hcme_providers::Result<Option<hcme_types::Conversation>> {
            Ok(None)
        }
        async fn update_conversation(&self, _c: &hcme_types::Conversation) -> hcme_providers::Result<()> {
            Ok(())
        }
        async fn delete_conversation(&self, _id: &str) -> hcme_providers::Result<()> {
            Ok(())
        }
        async fn store_message(
            &self,
            _m: &hcme_types::Message,
            _t: &[hcme_types::ToolCall],
        ) -> hcme_providers::Result<()> {
            Ok(())
        }
        async fn get_messages(
            &self,
            _conversation_id: &str,
            _limit: Option<usize>,
            _include_tool_calls: bool,
        ) -> hcme_providers::Result<Vec<hcme_types::Message>> {
            Ok(vec![])
        }
        async fn increment_counters(&self, _conversation_id: &str, _char_delta: u64) -> hcme_providers::Result<()> {
            Ok(())
        }
        async fn get_tool_calls(
            &self,
            _conversation_id: &str,
        ) -> hcme_providers::Result<Vec<(hcme_types::ToolCall, Option<hcme_types::ToolResult>)>> {
            Ok(vec![])
        }
        async fn store_summary(&self, _s: &hcme_types::Summary) -> hcme_providers::Result<()> {
            Ok(())
        }
        async fn get_summaries(
            &self,
            _conversation_id: &str,
            _level: hcme_types::SummaryLevel,
        ) -> hcme_providers::Result<Vec<hcme_types::Summary>> {
            Ok(vec![])
        }
        async fn update_embedding(&self, _node_id: &str, _embedding: Vec<f32>) -> hcme_providers::Result<()> {
            Ok(())
        }
        async fn merge_edges(
            &self,
            _relation: hcme_providers::RelationType,
            _from: &str,
            _to_many: &[String],
        ) -> hcme_providers::Result<()> {
            Ok(())
        }
        async fn vector_query(
            &self,
            _conversation_id: Option<&str>,
            _index: VectorIndex,
            _vector: &[f32],
            _top_k: usize,
            _level_filter: Option<hcme_types::SummaryLevel>,
        ) -> hcme_providers::Result<Vec<VectorMatch>> {
            Ok(self
                .units
                .iter()
                .map(|u| VectorMatch { uuid: u.uuid.clone(), score: 0.8 })
                .collect())
        }
        async fn all_embedded_nodes(
            &self,
            _conversation_id: &str,
            _index: VectorIndex,
            _level_filter: Option<hcme_types::SummaryLevel>,
        ) -> hcme_providers::Result<Vec<(String, Vec<f32>)>> {
            Ok(vec![])
        }
        async fn get_code_units(&self, uuids: &[String]) -> hcme_providers::Result<Vec<CodeUnit>> {
            Ok(self
                .units
                .iter()
                .filter(|u| uuids.contains(&u.uuid))
                .cloned()
                .collect())
        }
    }

    struct FakeEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FakeEmbedder {
        async fn embed_single(&self, _text: &str) -> hcme_providers::Result<Vec<f32>> {
            Ok(vec![1.0])
        }
    }

    struct FakeFileToolbox {
        entries: Vec<String>,
    }

    #[async_trait]
    impl FileToolbox for FakeFileToolbox {
        async fn grep_files(&self, _pattern: &str, _path: &str) -> hcme_providers::Result<Vec<GrepMatch>> {
            Ok(vec![])
        }
        async fn list_directory(&self, _path: &str) -> hcme_providers::Result<Vec<String>> {
            Ok(self.entries.clone())
        }
        async fn glob_files(&self, _pattern: &str, _path: &str) -> hcme_providers::Result<Vec<String>> {
            Ok(vec![])
        }
        async fn read_file(&self, _path: &str) -> hcme_providers::Result<String> {
            Ok(String::new())
        }
    }

    struct NoOpFallback;

    #[async_trait]
    impl CodeSearchFallback for NoOpFallback {
        async fn search(&self, _query: &str, _composition: &DirectoryComposition) -> Result<Vec<CodeHit>> {
            Ok(vec![])
        }
    }

    struct StubFallback {
        hits: Vec<CodeHit>,
    }

    #[async_trait]
    impl CodeSearchFallback for StubFallback {
        async fn search(&self, _query: &str, _composition: &DirectoryComposition) -> Result<Vec<CodeHit>> {
            Ok(self.hits.clone())
        }
    }

    fn unit(uuid: &str, file: &str, unit_type: CodeUnitType) -> CodeUnit {
        CodeUnit {
            uuid: uuid.to_string(),
            file: file.to_string(),
            start_line: 1,
            end_line: 10,
            source: "fn example() {}".to_string(),
            unit_type,
        }
    }

    #[tokio::test]
    async fn semantic_path_applies_type_boost_and_file_prefix_filter() {
        let store = FakeStore {
            units: vec![
                unit("u1", "/repo/src/lib.rs", CodeUnitType::MethodOrFunction),
                unit("u2", "/other/src/lib.rs", CodeUnitType::MethodOrFunction),
            ],
        };
        let registry = FakeRegistry {
            project: Some(ProjectInfo {
                id: "p1".to_string(),
                path: "/repo".to_string(),
                project_type: "rust".to_string(),
            }),
            ingestion_locked: false,
        };
        let embedder = FakeEmbedder;
        let toolbox = FakeFileToolbox { entries: vec![] };
        let fallback = NoOpFallback;

        let options = CodeSearchOptions {
            working_dir: "/repo".to_string(),
            initial_limit: 5,
            min_score: 0.0,
            char_budget: 10_000,
        };

        let hits = search_code(
            &store,
            Some(&embedder),
            &registry,
            &toolbox,
            &fallback,
            "query",
            &options,
            &ConfidenceTiers::default(),
        )
        .await
        .unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].file, "/repo/src/lib.rs");
        assert!((hits[0].score - 0.8 * 1.15).abs() < 1e-6);
    }

    #[tokio::test]
    async fn held_lock_routes_to_fallback() {
        let store = FakeStore {
            units: vec![unit("u1", "/repo/src/lib.rs", CodeUnitType::MethodOrFunction)],
        };
        let registry = FakeRegistry {
            project: Some(ProjectInfo {
                id: "p1".to_string(),
                path: "/repo".to_string(),
                project_type: "rust".to_string(),
            }),
            ingestion_locked: true,
        };
        let embedder = FakeEmbedder;
        let toolbox = FakeFileToolbox {
            entries: vec!["main.rs".to_string(), "README.md".to_string()],
        };
        let fallback = StubFallback {
            hits: vec![CodeHit {
                file: "/repo/src/main.rs".to_string(),
                start_line: 1,
                end_line: 2,
                source: "fn main() {}".to_string(),
                score: 0.3,
                confidence: 0.3,
            }],
        };

        let options = CodeSearchOptions {
            working_dir: "/repo".to_string(),
            initial_limit: 5,
            min_score: 0.0,
            char_budget: 10_000,
        };

        let hits = search_code(
            &store,
            Some(&embedder),
            &registry,
            &toolbox,
            &fallback,
            "query",
            &options,
            &ConfidenceTiers::default(),
        )
        .await
        .unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].file, "/repo/src/main.rs");
    }

    #[tokio::test]
    async fn unregistered_working_dir_routes_to_fallback() {
        let store = FakeStore { units: vec![] };
        let registry = FakeRegistry {
            project: None,
            ingestion_locked: false,
        };
        let embedder = FakeEmbedder;
        let toolbox = FakeFileToolbox { entries: vec![] };
        let fallback = StubFallback {
            hits: vec![CodeHit {
                file: "/scratch/a.rs".to_string(),
                start_line: 1,
                end_line: 1,
                source: "x".to_string(),
                score: 0.5,
                confidence: 0.5,
            }],
        };

        let options = CodeSearchOptions {
            working_dir: "/scratch".to_string(),
            initial_limit: 5,
            min_score: 0.0,
            char_budget: 10_000,
        };

        let hits = search_code(
            &store,
            Some(&embedder),
            &registry,
            &toolbox,
            &fallback,
            "query",
            &options,
            &ConfidenceTiers::default(),
        )
        .await
        .unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].confidence, 0.5);
    }

    #[tokio::test]
    async fn char_budget_drops_hits_once_exceeded() {
        let hits = vec![
            CodeHit {
                file: "a".to_string(),
                start_line: 1,
                end_line: 1,
                source: "x".repeat(50),
                score: 0.9,
                confidence: 1.0,
            },
            CodeHit {
                file: "b".to_string(),
                start_line: 1,
                end_line: 1,
                source: "y".repeat(50),
                score: 0.8,
                confidence: 1.0,
            },
        ];
        let kept = cap_by_char_budget(hits, 60);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].file, "a");
    }

    #[tokio::test]
    async fn directory_composition_counts_code_and_document_files() {
        let toolbox = FakeFileToolbox {
            entries: vec![
                "main.rs".to_string(),
                "lib.rs".to_string(),
                "README.md".to_string(),
                "Cargo.toml".to_string(),
            ],
        };
        let composition = compute_directory_composition(&toolbox, "/repo").await;
        assert_eq!(composition.code_file_count, 2);
        assert_eq!(composition.document_file_count, 1);
    }
}
