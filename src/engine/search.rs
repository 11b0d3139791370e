//! search.rs
//! Root/order search: seeds one consensus graph per candidate root, merges the
//! remaining trees into it in a seeded order, and keeps the cheapest candidate.

use super::error::AlignmentError;
use super::output::AlignmentOutput;
use crate::analysis::decompose;
use crate::compute::{align_pair, CostModel, PairwiseAlignment};
use crate::config::{AggregationPolicy, AlignmentConfig};
use crate::graph::{ConsensusGraph, ConsensusMerger};
use crate::report::Reporter;
use crate::store::NodeType;
use crate::tree::{BinaryView, ContourTree, TreeInput, TreeSource, ViewKind};
use log::Level;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag, checked between root candidates and
/// between merge steps.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self { Self::default() }
    pub fn cancel(&self) { self.0.store(true, Ordering::Relaxed); }
    pub fn is_cancelled(&self) -> bool { self.0.load(Ordering::Relaxed) }
}

/// Outcome of one root candidate.
struct Candidate {
    root: usize,
    graph: ConsensusGraph,
    cost: f64,
    merge_order: Vec<usize>,
}

pub struct AlignmentEngine<'r> {
    config: AlignmentConfig,
    cost: CostModel,
    reporter: &'r dyn Reporter,
    cancel: Option<CancelToken>,
}

impl<'r> AlignmentEngine<'r> {
    pub fn new(config: AlignmentConfig, reporter: &'r dyn Reporter) -> Result<Self, AlignmentError> {
        config.validate()?;
        let cost = CostModel::from_config(&config);
        Ok(Self { config, cost, reporter, cancel: None })
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn config(&self) -> &AlignmentConfig { &self.config }

    /// Aligns all `inputs` into one consensus graph.
    pub fn run(&self, inputs: &[TreeInput]) -> Result<AlignmentOutput, AlignmentError> {
        self.report(Level::Info, format!("Aligning {} trees.", inputs.len()));

        // 1. Adapters. Any construction failure aborts the whole run.
        let trees = inputs
            .iter()
            .enumerate()
            .map(|(i, input)| ContourTree::build(i, input))
            .collect::<Result<Vec<_>, _>>()?;

        // 2. Processing order and usable trees.
        let order = self.permutation(trees.len());
        self.report(Level::Debug, format!("Processing order {:?}.", order));
        let usable: Vec<usize> = order
            .iter()
            .copied()
            .filter(|&t| {
                let binary = trees[t].is_binary();
                if !binary {
                    self.report(Level::Warn, format!("Input {} not binary.", t));
                }
                binary
            })
            .collect();
        let Some(&seed) = usable.first() else {
            return Err(AlignmentError::NoBinaryInput);
        };

        // 3. One candidate per vertex of the seeding tree.
        let merger = ConsensusMerger::new(&trees, self.config.aggregation);
        let mut best: Option<Candidate> = None;
        for root in 0..trees[seed].node_count() {
            self.check_cancel()?;
            let Some(candidate) = self.evaluate_root(&merger, &trees, &usable, root)? else {
                continue;
            };
            self.report(Level::Info, format!("Root {} total cost {}.", root, candidate.cost));
            if best.as_ref().map_or(true, |b| candidate.cost < b.cost) {
                best = Some(candidate);
            }
        }
        let mut best = best.ok_or(AlignmentError::NoValidRoot)?;

        // 4. Branch decomposition of the winner.
        let branches = decompose(&mut best.graph);
        self.report(
            Level::Info,
            format!("Best root {} with cost {} ({} branches).", best.root, best.cost, branches),
        );

        Ok(AlignmentOutput::collect(&best.graph, &trees, best.root, best.cost, best.merge_order))
    }

    /// Processing order of `n` trees: a seeded shuffle, or the identity under
    /// `LastMatched`.
    pub fn permutation(&self, n: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..n).collect();
        if self.config.aggregation != AggregationPolicy::LastMatched {
            let mut rng = StdRng::seed_from_u64(self.config.seed);
            order.shuffle(&mut rng);
        }
        order
    }

    /// Seeds from `usable[0]` at `root` and merges the rest. `None` when the
    /// root is a saddle.
    fn evaluate_root(
        &self,
        merger: &ConsensusMerger,
        trees: &[ContourTree],
        usable: &[usize],
        root: usize,
    ) -> Result<Option<Candidate>, AlignmentError> {
        let seed = usable[0];
        if trees[seed].node(root).node_type == NodeType::Saddle {
            self.report(Level::Debug, format!("Root {} is a saddle, skipped.", root));
            return Ok(None);
        }

        let mut graph = ConsensusGraph::seed(&trees[seed], seed, root)?;
        self.report(Level::Debug, format!("Root {}: seeded from input {}.", root, seed));

        let mut cost = 0.0;
        let mut merge_order = vec![seed];
        for &t in &usable[1..] {
            self.check_cancel()?;
            match self.merge_tree(merger, &graph, trees, t)? {
                Some((merged, step)) => {
                    graph = merged;
                    cost += step;
                    merge_order.push(t);
                }
                None => self.report(Level::Warn, format!("Input {} not binary.", t)),
            }
        }
        Ok(Some(Candidate { root, graph, cost, merge_order }))
    }

    /// Aligns tree `t` against the consensus graph and merges the cheapest
    /// alignment that can be merged. `None` when no rooting of the tree yields
    /// a binary view.
    fn merge_tree(
        &self,
        merger: &ConsensusMerger,
        graph: &ConsensusGraph,
        trees: &[ContourTree],
        t: usize,
    ) -> Result<Option<(ConsensusGraph, f64)>, AlignmentError> {
        let tree = &trees[t];
        let (lefts, rights) = if self.config.free_root {
            (free_views(graph, 0..graph.node_count()), free_views(tree, tree.extrema()))
        } else {
            let root_type = graph.node(graph.root()).node_type;
            let mut roots: Vec<usize> = tree.extrema().filter(|&v| tree.node(v).node_type == root_type).collect();
            if roots.is_empty() {
                roots = tree.extrema().collect();
            }
            let rights: Vec<BinaryView> = roots
                .into_iter()
                .filter_map(|r| match BinaryView::rooted(tree, r) {
                    Ok(view) => Some(view),
                    Err(e) => {
                        self.report(Level::Debug, format!("Input {} root {}: {}.", t, r, e));
                        None
                    }
                })
                .collect();
            (vec![graph.rooted_view()?], rights)
        };

        // Midpoint roots only pair with midpoint roots.
        let mut scored: Vec<(usize, usize, PairwiseAlignment)> = Vec::new();
        for (i, left) in lefts.iter().enumerate() {
            for (j, right) in rights.iter().enumerate() {
                if is_dual(left) == is_dual(right) {
                    scored.push((i, j, align_pair(left, right, self.cost)));
                }
            }
        }
        // Stable: equal costs keep enumeration order.
        scored.sort_by(|a, b| a.2.cost.total_cmp(&b.2.cost));

        for (i, j, alignment) in scored {
            match merger.merge(graph, &lefts[i], &rights[j], &alignment.trace, t) {
                Ok(merged) => {
                    self.report(Level::Debug, format!("Merged input {} with cost {}.", t, alignment.cost));
                    return Ok(Some((merged, alignment.cost)));
                }
                Err(AlignmentError::UnmergeableView) => {
                    self.report(Level::Debug, format!("Input {}: alignment with cost {} not mergeable.", t, alignment.cost));
                }
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }

    fn check_cancel(&self) -> Result<(), AlignmentError> {
        match &self.cancel {
            Some(token) if token.is_cancelled() => Err(AlignmentError::Cancelled),
            _ => Ok(()),
        }
    }

    fn report(&self, level: Level, message: String) {
        self.reporter.report(level, &message);
    }
}

/// Primal views at every usable root in `roots` plus a dual view at every arc.
fn free_views<S: TreeSource>(src: &S, roots: impl Iterator<Item = usize>) -> Vec<BinaryView> {
    roots
        .filter_map(|r| BinaryView::rooted(src, r).ok())
        .chain((0..src.arc_count()).filter_map(|a| BinaryView::dual_rooted(src, a).ok()))
        .collect()
}

fn is_dual(view: &BinaryView) -> bool {
    view.node(view.root()).kind == ViewKind::Midpoint
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{CapturingReporter, Reporter};
    use rstest::rstest;
    use std::collections::BTreeSet;

    fn path() -> TreeInput {
        TreeInput::from_arcs(vec![0.0, 5.0, 10.0], &[(0, 1), (1, 2)])
    }

    fn superset() -> TreeInput {
        TreeInput::from_arcs(vec![0.0, 5.0, 10.0, 2.0, 8.0], &[(0, 3), (3, 1), (1, 2), (3, 4)])
    }

    fn star() -> TreeInput {
        TreeInput::from_arcs(vec![0.0, 1.0, 2.0, 3.0, 4.0], &[(0, 1), (0, 2), (0, 3), (0, 4)])
    }

    fn y_tree() -> TreeInput {
        TreeInput::from_arcs(vec![0.0, 4.0, 10.0, 7.0], &[(0, 1), (1, 2), (1, 3)])
    }

    fn run(inputs: &[TreeInput], config: AlignmentConfig) -> Result<AlignmentOutput, AlignmentError> {
        let reporter = CapturingReporter::new();
        AlignmentEngine::new(config, &reporter)?.run(inputs)
    }

    /// Every branch id labels a simple path of the output graph.
    fn assert_branches_are_paths(out: &AlignmentOutput) {
        let branches: BTreeSet<i64> = out.branch_ids.iter().copied().collect();
        for b in branches {
            assert!(b >= 0);
            let members = out.branch_ids.iter().filter(|&&x| x == b).count();
            let mut degree = vec![0; out.node_count()];
            let mut inner = 0;
            for e in 0..out.edge_count() {
                let (u, v) = out.edge_ends(e);
                if out.branch_ids[u] == b && out.branch_ids[v] == b {
                    inner += 1;
                    degree[u] += 1;
                    degree[v] += 1;
                }
            }
            assert_eq!(inner, members - 1, "branch {} is not connected", b);
            assert!(degree.iter().all(|&d| d <= 2), "branch {} is not a path", b);
        }
    }

    /// Cancels its token once the first consensus graph is seeded.
    struct CancelOnSeed(CancelToken);

    impl Reporter for CancelOnSeed {
        fn report(&self, _level: Level, message: &str) {
            if message.contains("seeded from input") {
                self.0.cancel();
            }
        }
    }

    #[test]
    fn test_identical_pair() {
        let out = run(&[path(), path()], AlignmentConfig::default()).unwrap();
        assert_eq!(out.node_count(), 3);
        assert_eq!(out.frequencies, vec![2, 2, 2]);
        assert_eq!(out.cost, 0.0);
        assert_eq!(out.edge_count(), 2);
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(7)]
    fn test_strict_superset_costs_the_extra_branch(#[case] seed: u64) {
        let config = AlignmentConfig::default().with_weights(1.0, 0.0, 0.0).with_seed(seed);
        let out = run(&[path(), superset()], config).unwrap();
        assert_eq!(out.cost, 2.0);

        let mut freqs = out.frequencies.clone();
        freqs.sort();
        assert_eq!(freqs, vec![1, 1, 2, 2, 2]);
    }

    #[test]
    fn test_same_seed_same_output() {
        let inputs = [superset(), path(), superset(), path()];
        let config = AlignmentConfig::default().with_weights(1.0, 1.0, 0.5).with_seed(42);
        let a = serde_json::to_string(&run(&inputs, config.clone()).unwrap()).unwrap();
        let b = serde_json::to_string(&run(&inputs, config).unwrap()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_frequency_and_coverage_invariants() {
        let inputs = [path(), superset(), path()];
        let out = run(&inputs, AlignmentConfig::default().with_weights(1.0, 1.0, 0.0)).unwrap();

        for i in 0..out.node_count() {
            let present = out.vertex_row(i).iter().filter(|&&v| v != -1).count();
            assert_eq!(out.frequencies[i], present);
            assert!(out.frequencies[i] <= inputs.len());
        }
        for t in 0..inputs.len() {
            let covered = (0..out.edge_count()).filter(|&e| out.arc_row(e)[t] != -1).count();
            assert_eq!(covered, inputs[t].edge_count);
        }
        assert_branches_are_paths(&out);
    }

    #[rstest]
    #[case(AggregationPolicy::Average)]
    #[case(AggregationPolicy::Median)]
    #[case(AggregationPolicy::LastMatched)]
    fn test_merged_branches_form_paths(#[case] policy: AggregationPolicy) {
        let inputs = [y_tree(), superset(), path(), superset()];
        for seed in 0..4 {
            let config = AlignmentConfig::default().with_weights(1.0, 1.0, 0.1).with_aggregation(policy).with_seed(seed);
            assert_branches_are_paths(&run(&inputs, config).unwrap());
        }
    }

    #[test]
    fn test_seed_changes_order_unless_last_matched() {
        let inputs = [path(), path(), path()];
        let orders = |policy: AggregationPolicy| -> BTreeSet<Vec<usize>> {
            (0..16)
                .map(|seed| {
                    let config = AlignmentConfig::default().with_aggregation(policy).with_seed(seed);
                    run(&inputs, config).unwrap().merge_order
                })
                .collect()
        };

        let shuffled = orders(AggregationPolicy::Average);
        assert!(shuffled.len() > 1);
        assert!(shuffled.iter().all(|o| o.iter().copied().collect::<BTreeSet<_>>().len() == 3));

        let stable = orders(AggregationPolicy::LastMatched);
        assert_eq!(stable.into_iter().collect::<Vec<_>>(), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn test_merge_order_is_the_seeded_permutation() {
        let reporter = CapturingReporter::new();
        let engine = AlignmentEngine::new(AlignmentConfig::default().with_seed(3), &reporter).unwrap();
        let out = engine.run(&[path(), path(), path()]).unwrap();
        assert_eq!(out.merge_order, engine.permutation(3));
        assert!(reporter.contains(Level::Debug, &format!("Processing order {:?}.", out.merge_order)));
    }

    #[test]
    fn test_winning_root_is_not_a_saddle() {
        let inputs = [superset(), superset()];
        let out = run(&inputs, AlignmentConfig::default().with_aggregation(AggregationPolicy::LastMatched)).unwrap();
        let seed = ContourTree::build(0, &inputs[0]).unwrap();
        assert_ne!(seed.node(out.root).node_type, NodeType::Saddle);
    }

    #[test]
    fn test_non_binary_inputs_are_skipped_with_a_warning() {
        let reporter = CapturingReporter::new();
        let config = AlignmentConfig::default().with_aggregation(AggregationPolicy::LastMatched);
        let out = AlignmentEngine::new(config, &reporter).unwrap().run(&[path(), star(), path()]).unwrap();

        assert!(reporter.contains(Level::Warn, "Input 1 not binary."));
        assert_eq!(reporter.count(Level::Warn), 1);
        assert_eq!(out.merge_order, vec![0, 2]);
        assert!((0..out.node_count()).all(|i| out.vertex_row(i)[1] == -1));
        assert_eq!(out.frequencies, vec![2, 2, 2]);
    }

    #[rstest]
    #[case(vec![])]
    #[case(vec![star()])]
    #[case(vec![star(), star()])]
    fn test_no_binary_input(#[case] inputs: Vec<TreeInput>) {
        assert_eq!(run(&inputs, AlignmentConfig::default()).unwrap_err(), AlignmentError::NoBinaryInput);
    }

    #[test]
    fn test_construction_mismatch_aborts() {
        let mut bad = path();
        bad.vertex_count = 4;
        bad.scalars.push(1.0);
        let err = run(&[path(), bad], AlignmentConfig::default()).unwrap_err();
        assert_eq!(err, AlignmentError::ConstructionMismatch { tree: 1, declared: 4, realized: 3 });
    }

    #[test]
    fn test_cancelled_before_start() {
        let reporter = CapturingReporter::new();
        let token = CancelToken::new();
        token.cancel();
        let engine = AlignmentEngine::new(AlignmentConfig::default(), &reporter).unwrap().with_cancel(token);
        assert_eq!(engine.run(&[path(), path()]).unwrap_err(), AlignmentError::Cancelled);
    }

    #[test]
    fn test_cancelled_between_merge_steps() {
        let token = CancelToken::new();
        let reporter = CancelOnSeed(token.clone());
        let engine = AlignmentEngine::new(AlignmentConfig::default(), &reporter).unwrap().with_cancel(token.clone());
        assert_eq!(engine.run(&[path(), path()]).unwrap_err(), AlignmentError::Cancelled);
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_free_root_identical_pair() {
        let out = run(&[path(), path()], AlignmentConfig::default().with_free_root(true)).unwrap();
        assert_eq!(out.cost, 0.0);
        assert_eq!(out.frequencies, vec![2, 2, 2]);
        assert_branches_are_paths(&out);
    }

    #[test]
    fn test_free_root_superset_keeps_invariants() {
        let inputs = [path(), superset(), y_tree()];
        let config = AlignmentConfig::default().with_weights(1.0, 0.0, 0.0).with_free_root(true);
        let out = run(&inputs[..2], config.clone()).unwrap();
        assert_eq!(out.cost, 2.0);
        let mut freqs = out.frequencies.clone();
        freqs.sort();
        assert_eq!(freqs, vec![1, 1, 2, 2, 2]);

        let out = run(&inputs, config).unwrap();
        for t in 0..inputs.len() {
            let covered = (0..out.edge_count()).filter(|&e| out.arc_row(e)[t] != -1).count();
            assert_eq!(covered, inputs[t].edge_count);
        }
        assert_branches_are_paths(&out);
    }

    #[rstest]
    #[case(path(), superset())]
    #[case(superset(), y_tree())]
    #[case(y_tree(), path())]
    fn test_free_root_never_costs_more(#[case] a: TreeInput, #[case] b: TreeInput) {
        let config = AlignmentConfig::default().with_weights(1.0, 1.0, 0.0);
        let inputs = [a, b];
        let consistent = run(&inputs, config.clone()).unwrap();
        let free = run(&inputs, config.with_free_root(true)).unwrap();
        assert!(free.cost <= consistent.cost);
    }

    #[test]
    fn test_invalid_weights_are_rejected() {
        let reporter = CapturingReporter::new();
        let config = AlignmentConfig::default().with_weights(-1.0, 1.0, 0.0);
        assert!(matches!(AlignmentEngine::new(config, &reporter), Err(AlignmentError::InvalidConfig(_))));
    }

    #[test]
    fn test_single_tree_is_its_own_consensus() {
        let reporter = CapturingReporter::new();
        let out = AlignmentEngine::new(AlignmentConfig::default(), &reporter).unwrap().run(&[superset()]).unwrap();
        assert_eq!(out.node_count(), 5);
        assert_eq!(out.cost, 0.0);
        assert!(out.frequencies.iter().all(|&f| f == 1));
        assert!(reporter.contains(Level::Info, "Best root 0"));
        assert!(reporter.contains(Level::Debug, "Root 1 is a saddle, skipped."));
    }
}
