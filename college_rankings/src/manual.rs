/*!

This is the long-form manual for `college_rankings` and `nirfview`.

## Input records

Both data endpoints serve a JSON array of flat records: each record maps a
column name to a scalar (string, number, or null). The same records can be
read from local JSON, CSV or Excel (.xlsx) dumps.

### Ranking records

The identifier is read from `Institute ID`, then `id`, and defaults to `N/A`.
The display name is read from `Name`, then `name`, and defaults to
`Unknown College`.

Yearly values use one column per metric and per year, from 2017 to 2025:

| Metric | Column |
|--------|--------|
| Rank | `Rank_<year>` |
| Overall score | `Score_<year>` |
| Teaching, Learning & Resources | `TLR (100)_<year>` |
| Research & Professional Practice | `RPC (100)_<year>` |
| Graduation Outcomes | `GO (100)_<year>` |
| Outreach & Inclusivity | `OI (100)_<year>` |
| Peer perception | `PERCEPTION (100)_<year>` |

A cell that is missing, null or empty means that there is no data for that
year. Other cells are read as numbers: JSON numbers are taken as they are,
and strings are read up to the first character that cannot belong to a
number (`"72.5*"` reads as 72.5). A cell with no number at all, such as
`"N/A"`, is kept as an unreadable value and displayed as missing.

All the columns whose name contains an underscore are also kept verbatim.
This is how the sub-metric tables are filled, from columns named
`<CODE>_<year>`:

* TLR: `SS`, `FSR`, `FQE`, `FRU`
* RPC: `PU`, `QP`, `IPR`, `FPPP`
* GO: `GPHE`, `GUE`, `MS`, `GPHD`
* OI: `RD`, `WD`, `ESCS`, `PCS`
* PERCEPTION: `PR`

### Prediction records

| Field | Columns, in order of preference | Default |
|-------|---------------------------------|---------|
| College | `College`, `Name` | `Unknown` |
| Predicted rank | `Predicted_Rank_2026`, `Predicted_Rank_2025` | 0 |
| Predicted score | `Predicted_Score_2026`, `Predicted_Score_2025` | 0 |
| Current rank | `Actual_Rank_2025`, `Current_Rank_2025` | 0 |
| Current score | `Actual_Score_2025`, `Current_Score_2025` | none |

The change is the current rank minus the predicted rank. A positive change
is an expected improvement. When one of the ranks is unknown, the change is
computed against 0 and should not be trusted.

## Views

* `cards`: the entities that have a rank or a score for the chosen year,
  filtered by name and sorted by rank (missing ranks last), by score
  (highest first, missing as 0) or by name.
* `detail`: the history of one entity, most recent year first, its charts
  and its sub-metric tables.
* `compare`: up to 6 selected entities side by side, with radar and trend
  data. Selecting more than the configured maximum is refused with a notice.
* `predictions`: the predictions by predicted rank, unranked last.
* `status`: whether the data source answers.
* `summary`: counts and the latest year of each entity.

## Configuration

The configuration file is a JSON object:

```json
{
  "apiBaseUrl": "http://localhost:8000",
  "defaultYear": 2025,
  "maxCompareSelection": 6,
  "maxSuggestions": 10
}
```

`collegesFile` and `predictionsFile` can be used instead of `apiBaseUrl`,
with paths relative to the configuration file. The environment variable
`NIRF_API_URL` is used when no base URL is configured. Command line flags
take precedence over the file.

*/
