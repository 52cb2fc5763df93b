//! In-memory store of papers found during the session.

use indexmap::IndexMap;
use tokio::sync::RwLock;

use crate::arxiv::Paper;

/// Papers keyed by short arXiv id, in the order they were first seen.
#[derive(Debug, Default)]
pub struct PaperIndex {
    papers: RwLock<IndexMap<String, Paper>>,
}

impl PaperIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `papers`, replacing older copies; returns their ids in order.
    pub async fn insert_all(&self, papers: Vec<Paper>) -> Vec<String> {
        let mut index = self.papers.write().await;
        papers
            .into_iter()
            .map(|paper| {
                let id = paper.id.clone();
                index.insert(id.clone(), paper);
                id
            })
            .collect()
    }

    pub async fn get(&self, id: &str) -> Option<Paper> {
        self.papers.read().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.papers.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arxiv::{parse_feed, tests::FEED};

    #[tokio::test]
    async fn insert_and_lookup() {
        let index = PaperIndex::new();
        let ids = index.insert_all(parse_feed(FEED).unwrap()).await;
        assert_eq!(ids, vec!["1310.7911v2", "2001.00001v1"]);

        // Re-inserting the same papers does not duplicate them.
        index.insert_all(parse_feed(FEED).unwrap()).await;
        assert_eq!(index.len().await, 2);

        assert_eq!(index.get("2001.00001v1").await.unwrap().title, "Second");
        assert!(index.get("0000.0000").await.is_none());
    }
}
