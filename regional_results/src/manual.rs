/*!

This is the long-form manual for `regional_results` and `refmap`.

## Pipeline

The results of a referendum are published per department. `refmap` brings
them to the level of the regions and draws the share of `Choice A` among the
expressed ballots on a map. Four stages run one after the other:

1. **areas**: each department is attached to its region
   ([crate::resolve_areas]).
2. **join**: each ballot row is attached to the area of its department
   ([crate::join_ballots]).
3. **sums**: the vote categories are summed per region
   ([crate::aggregate_regions]).
4. **ratios**: each region is attached to its boundary and gets its ratio
   `choice_a / (choice_a + choice_b)` ([crate::compute_ratios]).

## Codes

Department and region codes are strings. `1`, `01` and ` 01 ` are the same
department: codes are trimmed and zero-padded to a fixed width (2 by default)
before any comparison. Codes longer than the width, such as `971`, are kept
as they are. A code is never turned into a number.

## Overseas and foreign-resident ballots

The referendum table also holds the ballots of overseas territories and of
French people living abroad. Their codes contain letters (`ZA`, `ZZ`...). They
do not belong to any mainland region and are left out before the join. This
is counted, not reported as a problem.

By default any code with a letter is left out. With the `overseasMarker`
option only the codes containing the marker are: this keeps the Corsican
departments `2A` and `2B` in the join.

## Data problems

The run does not stop for a bad row. The row is dropped and a warning is
emitted, with the offending code:

| warning | meaning |
|---------|---------|
| `DuplicateRegion` | two regions with the same code, the first one is kept |
| `DuplicateDepartment` | two departments with the same code, the first one is kept |
| `UnknownRegion` | a department refers to a region that does not exist |
| `UnresolvedKey` | a ballot with a mainland code that no department knows |
| `InconsistentGrouping` | rows of one region disagree on its name, the region is dropped |
| `MissingGeometry` | a region has results but no boundary, it is not drawn |

A region where nobody chose either option has no ratio. It is shown as
`undefined` (grey on the map, `null` in the summary), never as `0`.

An empty input table stops the run, and so do sums too large for the
counters of a region.

## Input formats

### `csv`

The default. The first row holds the column names.

- regions: `code`, `name`
- departments: `region_code`, `code`, `name`
- referendum, separated by `;`: `Department code`, `Registered`,
  `Abstentions`, `Null`, `Choice A`, `Choice B`

All the column names and the separator can be changed in the configuration.

### `xlsx`

The same tables, one per Excel file. The worksheet is given with
`excelWorksheetName`, or the workbook must have a single sheet. Numeric cells
holding codes are read back as integers and then padded.

### `geojson`

The region boundaries: a `FeatureCollection` of `Polygon` or `MultiPolygon`
features. The region code is read from the `code` property (see
`codeProperty`).

## Configuration

Instead of passing every file on the command line, a JSON file can describe
the run. Paths are relative to the configuration file.

```json
{
  "outputSettings": {
    "title": "Referendum results: Choice A ratio",
    "summaryFile": "summary.json",
    "mapFile": "map.svg"
  },
  "sources": {
    "regions": { "provider": "csv", "filePath": "data/regions.csv" },
    "departments": { "provider": "csv", "filePath": "data/departments.csv" },
    "referendum": { "provider": "csv", "filePath": "data/referendum.csv", "delimiter": ";" },
    "geometry": { "provider": "geojson", "filePath": "data/regions.geojson" }
  },
  "rules": {
    "departmentCodeWidth": 2,
    "regionCodeWidth": 2
  }
}
```

```bash
refmap --config referendum.json
refmap --regions regions.csv --departments departments.csv \
  --referendum referendum.csv --geometry regions.geojson --map map.svg --out stdout
```

## Outputs

- the summary, in JSON (`--out`): the rules, the join counters, one entry per
  region and the list of warnings. It ends with a SHA-256 digest of the result
  table, which is the same for two runs over the same data.
- the map, in SVG (`--map`).
- `--reference` compares the summary with a previously saved one and fails
  on any difference.

*/
