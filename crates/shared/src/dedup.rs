//! Near-duplicate detection.
//!
//! Articles are compared pairwise with token Jaccard similarity and linked
//! into clusters through a disjoint-set forest, so cluster membership does not
//! depend on the order articles arrive in. Within a cluster the strongest
//! article (highest score, then longest body, then earliest position) always
//! survives and removes the members directly similar to it; members it does
//! not reach are resolved again among themselves.

use std::collections::{BTreeMap, HashSet};

use crate::models::Article;

type Tokens = (HashSet<String>, HashSet<String>);

pub struct Deduplicator {
    threshold: f64,
}

impl Deduplicator {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Drop articles that duplicate a stronger survivor, preserving input order.
    pub fn deduplicate(&self, articles: Vec<Article>) -> Vec<Article> {
        let tokens = tokenize_all(&articles);
        let clusters = self.group(&articles, &tokens);

        let mut keep = vec![false; articles.len()];
        for members in &clusters {
            let mut remaining = members.clone();
            // Strongest first; sort_by is stable so full ties keep input order
            remaining.sort_by(|&a, &b| rank(&articles[b], &articles[a]));

            while !remaining.is_empty() {
                let survivor = remaining.remove(0);
                keep[survivor] = true;
                remaining.retain(|&idx| {
                    let duplicate = self.linked(&articles, &tokens, survivor, idx);
                    if duplicate {
                        tracing::debug!(
                            removed = %articles[idx].title,
                            kept = %articles[survivor].title,
                            "dropping duplicate article"
                        );
                    }
                    !duplicate
                });
            }
        }

        articles
            .into_iter()
            .zip(keep)
            .filter_map(|(article, kept)| kept.then_some(article))
            .collect()
    }

    /// Index clusters in order of their first member. Singletons included.
    pub fn clusters(&self, articles: &[Article]) -> Vec<Vec<usize>> {
        self.group(articles, &tokenize_all(articles))
    }

    fn group(&self, articles: &[Article], tokens: &[Tokens]) -> Vec<Vec<usize>> {
        let mut sets = DisjointSet::new(articles.len());
        for i in 0..articles.len() {
            for j in (i + 1)..articles.len() {
                if self.linked(articles, tokens, i, j) {
                    sets.union(i, j);
                }
            }
        }

        // BTreeMap keyed by the smallest member keeps the output ordered
        let mut grouped: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        let mut first_of_root: Vec<Option<usize>> = vec![None; articles.len()];
        for idx in 0..articles.len() {
            let root = sets.find(idx);
            let first = *first_of_root[root].get_or_insert(idx);
            grouped.entry(first).or_default().push(idx);
        }

        grouped.into_values().collect()
    }

    fn linked(&self, articles: &[Article], tokens: &[Tokens], i: usize, j: usize) -> bool {
        published_close(&articles[i], &articles[j]) && pair_similarity(&tokens[i], &tokens[j]) >= self.threshold
    }
}

fn tokenize_all(articles: &[Article]) -> Vec<Tokens> {
    articles
        .iter()
        .map(|a| (tokenize(&a.title), tokenize(&a.body_text)))
        .collect()
}

/// Score first, then body length. Equal means a full tie.
fn rank(a: &Article, b: &Article) -> std::cmp::Ordering {
    a.relevance_score
        .partial_cmp(&b.relevance_score)
        .unwrap_or(std::cmp::Ordering::Equal)
        .then_with(|| a.body_text.len().cmp(&b.body_text.len()))
}

/// Same or adjacent publish day. Undated articles are always compared.
fn published_close(a: &Article, b: &Article) -> bool {
    match (a.published_at, b.published_at) {
        (Some(a), Some(b)) => (a.date_naive() - b.date_naive()).num_days().abs() <= 1,
        _ => true,
    }
}

fn pair_similarity(a: &Tokens, b: &Tokens) -> f64 {
    let title = jaccard(&a.0, &b.0);
    if a.1.is_empty() || b.1.is_empty() {
        return title;
    }
    title.max(jaccard(&a.1, &b.1))
}

pub fn similarity(a: &Article, b: &Article) -> f64 {
    pair_similarity(
        &(tokenize(&a.title), tokenize(&a.body_text)),
        &(tokenize(&b.title), tokenize(&b.body_text)),
    )
}

fn tokenize(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// Union-find with path halving and union by rank.
struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
            rank: vec![0; size],
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }
}
