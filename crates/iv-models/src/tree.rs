//! CART regression tree with squared-error splits.

use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use iv_types::IvResult;

use crate::{check_features, check_training_data, not_fitted, Regressor};

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn predict_row(&self, row: &ArrayView1<f64>) -> f64 {
        let mut node = self;
        loop {
            match node {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold { left } else { right };
                }
            }
        }
    }

    fn depth(&self) -> usize {
        match self {
            Node::Leaf { .. } => 0,
            Node::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }
}

struct SplitChoice {
    feature: usize,
    threshold: f64,
    left: Vec<usize>,
    right: Vec<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTreeRegressor {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    root: Option<Node>,
    n_features: usize,
}

impl DecisionTreeRegressor {
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            min_samples_split: 2,
            min_samples_leaf: 1,
            root: None,
            n_features: 0,
        }
    }

    /// Depth of the fitted tree; `None` before fitting.
    pub fn depth(&self) -> Option<usize> {
        self.root.as_ref().map(Node::depth)
    }

    fn build(&self, x: &Array2<f64>, y: &Array1<f64>, indices: Vec<usize>, depth: usize) -> Node {
        let n = indices.len();
        let mean = indices.iter().map(|&i| y[i]).sum::<f64>() / n as f64;

        if depth >= self.max_depth || n < self.min_samples_split || n < 2 * self.min_samples_leaf {
            return Node::Leaf { value: mean };
        }

        match self.best_split(x, y, &indices) {
            Some(split) => Node::Split {
                feature: split.feature,
                threshold: split.threshold,
                left: Box::new(self.build(x, y, split.left, depth + 1)),
                right: Box::new(self.build(x, y, split.right, depth + 1)),
            },
            None => Node::Leaf { value: mean },
        }
    }

    /// Find the split maximizing the squared-error reduction.
    ///
    /// Minimizing `SSE_left + SSE_right` is the same as maximizing
    /// `sum_l² / n_l + sum_r² / n_r`, which prefix sums give in one pass.
    fn best_split(&self, x: &Array2<f64>, y: &Array1<f64>, indices: &[usize]) -> Option<SplitChoice> {
        let n = indices.len();
        let total: f64 = indices.iter().map(|&i| y[i]).sum();
        let parent_score = total * total / n as f64;
        let min_gain = 1e-12 * (1.0 + parent_score.abs());

        let mut best: Option<(usize, f64, f64)> = None;
        let mut sorted = indices.to_vec();

        for feature in 0..x.ncols() {
            sorted.sort_by(|&a, &b| x[[a, feature]].total_cmp(&x[[b, feature]]));

            let mut left_sum = 0.0;
            for k in 0..n - 1 {
                left_sum += y[sorted[k]];
                let n_left = k + 1;
                let n_right = n - n_left;

                let here = x[[sorted[k], feature]];
                let next = x[[sorted[k + 1], feature]];
                if here == next || n_left < self.min_samples_leaf || n_right < self.min_samples_leaf {
                    continue;
                }

                let right_sum = total - left_sum;
                let score = left_sum * left_sum / n_left as f64 + right_sum * right_sum / n_right as f64;
                let gain = score - parent_score;
                if gain > min_gain && best.map_or(true, |(_, _, g)| gain > g) {
                    best = Some((feature, (here + next) / 2.0, gain));
                }
            }
        }

        let (feature, threshold, _) = best?;
        let (left, right): (Vec<usize>, Vec<usize>) =
            indices.iter().partition(|&&i| x[[i, feature]] <= threshold);
        Some(SplitChoice {
            feature,
            threshold,
            left,
            right,
        })
    }
}

impl Default for DecisionTreeRegressor {
    fn default() -> Self {
        Self::new(10)
    }
}

impl Regressor for DecisionTreeRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> IvResult<()> {
        check_training_data(self.name(), x, y)?;
        self.n_features = x.ncols();
        self.root = Some(self.build(x, y, (0..x.nrows()).collect(), 0));
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> IvResult<Array1<f64>> {
        let root = self.root.as_ref().ok_or_else(|| not_fitted(self.name()))?;
        check_features(self.n_features, x)?;
        Ok(x.outer_iter().map(|row| root.predict_row(&row)).collect())
    }

    fn name(&self) -> &str {
        "Decision Tree"
    }
}
