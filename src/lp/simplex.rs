use crate::config::Config;
use crate::error::SolveError;
use crate::lp::{LinearProgram, LpSolution, LpSolver, Relation};

/// 內建的稠密單純形法（Big-M）。這是 LpSolver 能力的預設提供者，
/// 規模假設與引擎其它部份相同：中小型拓撲。
pub struct SimplexSolver {
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for SimplexSolver {
    fn default() -> Self {
        SimplexSolver {
            tolerance: 1e-9,
            max_iterations: 10_000,
        }
    }
}

impl SimplexSolver {
    pub fn from_config() -> Self {
        let config = Config::get();
        SimplexSolver {
            tolerance: config.lp_tolerance,
            max_iterations: config.lp_max_iterations,
        }
    }
}

struct Row {
    coeffs: Vec<f64>,
    relation: Relation,
    rhs: f64,
}

impl LpSolver for SimplexSolver {
    fn solve(&self, lp: &LinearProgram) -> Result<LpSolution, SolveError> {
        let n = lp.num_vars();
        let tol = self.tolerance;

        // 限制式展開成稠密列，有限上界補成 x_i ≤ u_i 的列
        let mut rows: Vec<Row> = vec![];
        for c in lp.constraints.iter() {
            let mut coeffs = vec![0.0; n];
            for &(j, v) in c.coeffs.iter() {
                coeffs[j] += v;
            }
            rows.push(Row {
                coeffs,
                relation: c.relation,
                rhs: c.rhs,
            });
        }
        for (j, &ub) in lp.upper_bounds.iter().enumerate() {
            if ub.is_finite() {
                let mut coeffs = vec![0.0; n];
                coeffs[j] = 1.0;
                rows.push(Row {
                    coeffs,
                    relation: Relation::Le,
                    rhs: ub,
                });
            }
        }
        // 右端項翻成非負
        for row in rows.iter_mut() {
            if row.rhs < 0.0 {
                row.rhs = -row.rhs;
                for v in row.coeffs.iter_mut() {
                    *v = -*v;
                }
                row.relation = match row.relation {
                    Relation::Le => Relation::Ge,
                    Relation::Ge => Relation::Le,
                    Relation::Eq => Relation::Eq,
                };
            }
        }

        let m = rows.len();
        let n_slack = m; // 每列至多一個鬆弛或剩餘變數的欄位
        let n_art = rows
            .iter()
            .filter(|r| r.relation != Relation::Le)
            .count();
        let n_cols = n + n_slack + n_art + 1; // 最後一欄是右端項
        let rhs_col = n_cols - 1;

        let big_m = 1e6
            * (1.0
                + lp.objective
                    .iter()
                    .fold(0.0f64, |acc, &c| acc.max(c.abs())));

        let mut tableau = vec![vec![0.0; n_cols]; m + 1];
        let mut basis = vec![0usize; m];
        let mut next_art = n + n_slack;
        for (r, row) in rows.iter().enumerate() {
            tableau[r][..n].copy_from_slice(&row.coeffs);
            tableau[r][rhs_col] = row.rhs;
            match row.relation {
                Relation::Le => {
                    tableau[r][n + r] = 1.0;
                    basis[r] = n + r;
                }
                Relation::Ge => {
                    tableau[r][n + r] = -1.0;
                    tableau[r][next_art] = 1.0;
                    basis[r] = next_art;
                    next_art += 1;
                }
                Relation::Eq => {
                    tableau[r][next_art] = 1.0;
                    basis[r] = next_art;
                    next_art += 1;
                }
            }
        }
        for (j, &c) in lp.objective.iter().enumerate() {
            tableau[m][j] = c;
        }
        for j in (n + n_slack)..(n_cols - 1) {
            tableau[m][j] = big_m;
        }
        // 消去人工變數欄，讓目標列回到標準型
        for r in 0..m {
            if basis[r] >= n + n_slack {
                let factor = tableau[m][basis[r]];
                if factor.abs() > tol {
                    for j in 0..n_cols {
                        tableau[m][j] -= factor * tableau[r][j];
                    }
                }
            }
        }

        let mut iterations = 0;
        loop {
            // 取最負的檢驗數進基；人工變數離基後不再回來
            let mut entering = None;
            let mut best = -tol;
            for j in 0..(n + n_slack) {
                if tableau[m][j] < best {
                    best = tableau[m][j];
                    entering = Some(j);
                }
            }
            let entering = match entering {
                Some(j) => j,
                None => break,
            };
            // 最小比值測試
            let mut leaving = None;
            let mut best_ratio = f64::INFINITY;
            for r in 0..m {
                if tableau[r][entering] > tol {
                    let ratio = tableau[r][rhs_col] / tableau[r][entering];
                    if ratio < best_ratio {
                        best_ratio = ratio;
                        leaving = Some(r);
                    }
                }
            }
            let leaving = match leaving {
                Some(r) => r,
                None => return Err(SolveError::Unbounded),
            };
            pivot(&mut tableau, leaving, entering);
            basis[leaving] = entering;

            iterations += 1;
            if iterations >= self.max_iterations {
                return Err(SolveError::Infeasible(format!(
                    "單純形法在 {} 次疊代內未收斂",
                    self.max_iterations
                )));
            }
        }

        // 人工變數留在基底且非零，代表原問題無可行解
        for r in 0..m {
            if basis[r] >= n + n_slack && tableau[r][rhs_col].abs() > tol.max(1e-7) {
                return Err(SolveError::Infeasible("線性規劃限制式互相矛盾".to_owned()));
            }
        }

        let mut values = vec![0.0; n];
        for r in 0..m {
            if basis[r] < n {
                values[basis[r]] = tableau[r][rhs_col].max(0.0);
            }
        }
        let objective = values
            .iter()
            .zip(lp.objective.iter())
            .map(|(&x, &c)| x * c)
            .sum();
        Ok(LpSolution { values, objective })
    }
}

fn pivot(tableau: &mut Vec<Vec<f64>>, pivot_row: usize, pivot_col: usize) {
    let pivot_val = tableau[pivot_row][pivot_col];
    assert!(pivot_val.abs() > 1e-15, "單純形法樞軸元素為零");
    for v in tableau[pivot_row].iter_mut() {
        *v /= pivot_val;
    }
    for r in 0..tableau.len() {
        if r == pivot_row {
            continue;
        }
        let factor = tableau[r][pivot_col];
        if factor == 0.0 {
            continue;
        }
        for j in 0..tableau[r].len() {
            tableau[r][j] -= factor * tableau[pivot_row][j];
        }
    }
}
