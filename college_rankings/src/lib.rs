/*!
Normalization and derived views for multi-year institutional ranking tables.

Ranking tables are wide and sparse: one row per institution, one column per
metric and per year, with many holes. This crate turns such rows into
[College] entities with one year-series per metric, and computes the views
built on top of them: filtered and sorted lists, bounded comparison
selections, historical tables, chart series and prediction deltas.

```
use college_rankings::normalize::normalize_record;
use serde_json::json;

let row = json!({"Institute ID": "X1", "Name": "Test U", "Rank_2025": "5"});
let college = normalize_record(row.as_object().unwrap());
assert_eq!(college.latest_year_with_data(), Some(2025));
```

See the [manual] for the conventions of the input columns.
*/

mod config;
pub mod manual;
pub mod normalize;
pub mod predictions;
pub mod resolver;
pub mod select;
pub mod store;

pub use crate::config::*;
