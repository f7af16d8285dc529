/*!

This is the long-form manual for `need_scoring` and `gapscore`.

## Input formats

Each run reads three categories of records:
* `enrolment` new registrations
* `biometric` biometric updates
* `demographic` demographic updates

Each category is read from a directory of CSV files. All the files with the `.csv`
extension are read, in the order of their names. The columns are found by their name
in the header, so their order does not matter and extra columns are ignored.

| category      | metric columns                             |
|---------------|--------------------------------------------|
| `enrolment`   | `age_0_5`, `age_5_17`, `age_18_greater`    |
| `biometric`   | `bio_age_5_17`, `bio_age_17_`              |
| `demographic` | `demo_age_5_17`, `demo_age_17_`            |

The columns `date`, `state` and `pincode` are required for all the categories. The
`district` column is optional. For example:

```text
date,state,district,pincode,age_0_5,age_5_17,age_18_greater
15-01-2025,Karnataka,Bangalore,560001,40,50,10
20-02-2025,KARNATAKA,Bengaluru,560001,60,60,30
```

Dates are day first (`15-01-2025`, `15/01/2025` or `15.01.2025`). ISO dates
(`2025-01-15`) are also accepted. The metric values must be non-negative integers.
An empty `state` or `district` cell is treated as missing.

Any structural problem (a missing column, a date or a number that cannot be read, a
missing pincode) stops the run with an error pointing to the file and the line.

## Location labels

The state and district labels are cleaned before anything else: whitespace is trimmed
and runs of spaces are collapsed, labels are title-cased and `&` is spelled `And`. Known
variants are then rewritten to their current official names (`Orissa` becomes `Odisha`, `Bangalore` becomes
`Bengaluru`, any label mentioning `Jammu` becomes `Jammu and Kashmir`, ...). Districts
that now belong to Telangana (for example `Hyderabad`) are moved to that state.

A record whose state is missing, numeric or outside the list of states and union
territories is dropped. The number of dropped records is reported for each category.

## Scoring

Records are summed per pincode, location and month within each category, and the three
categories are joined on the pincode and the month. A pincode present in only one
category still counts, with zeros for the other categories.

For each pincode:
- `total_demand` is the sum over all the months and categories
- `growth` is the mean month-over-month change `(current - previous) / (previous + 1)`,
  reported as a percentage
- `supply_capacity`, `pop_density` and `access_difficulty` are simulated signals, drawn
  from a seeded random generator so that two runs with the same seed give the same result
- `demand_supply_ratio` is `total_demand / supply_capacity`

The need score is a weighted sum of the min-max normalized signals, scaled to 0..100:

| signal                               | default weight |
|--------------------------------------|----------------|
| demand/supply ratio                  | 0.35           |
| population density                   | 0.25           |
| growth (clipped to 0..1)             | 0.20           |
| access difficulty                    | 0.20           |

A signal that has the same value for every pincode contributes 0. Locations are ranked by
decreasing score, ties broken by increasing pincode, and the first 500 are kept.

The reported `need_score`, `growth` and `demand_supply_ratio` are rounded to one decimal,
halves going to the even neighbour: 12.25 is reported as 12.2 and 12.75 as 12.8.

Counts are added without wrapping: a total that does not fit in 64 bits stops the run
with an error naming the pincode (and the category, when the total belongs to one).

A run in which no record survives the cleaning of the location labels fails with an
error, and no output file is written. An empty `top_priority_locations` list is never
produced.

## Configuration

`gapscore` can run directly on a directory containing the `api_data_aadhar_enrolment`,
`api_data_aadhar_biometric` and `api_data_aadhar_demographic` directories:

```text
gapscore --input /data --out gap_data.json
```

Otherwise, it accepts a configuration file in JSON. Relative paths are resolved from the
directory of the configuration file.

```text
{
  "outputSettings": { "outputPath": "gap_data.json" },
  "sources": [
    { "category": "enrolment", "directory": "api_data_aadhar_enrolment" },
    { "category": "biometric", "directory": "api_data_aadhar_biometric" },
    { "category": "demographic", "directory": "api_data_aadhar_demographic" }
  ],
  "rules": { "randomSeed": 42, "topN": 500 }
}
```

All the fields of `rules` are optional and replace the defaults:
 - `demandSupplyWeight`, `popDensityWeight`, `growthWeight`, `accessDifficultyWeight`
   (numbers): the weights of the score. They must sum to 1.
 - `supplyJitterRange`, `popDensityRange`, `accessDifficultyRange` (pairs of numbers):
   the ranges of the simulated signals. The supply capacity is the total demand times a
   jitter drawn from `supplyJitterRange`, and at least `supplyFloor`.
 - `supplyFloor` (number): the minimum supply capacity.
 - `growthClip` (pair of numbers): the range growth is clipped to before scoring.
 - `randomSeed` (integer): the seed of the simulated signals.
 - `topN` (integer): the number of locations kept.

## Output

```text
{
  "last_updated": "2025-03-01 10:12:45",
  "top_priority_locations": [
    {
      "rank": 1,
      "pincode": "560001",
      "state": "Karnataka",
      "district": "Bengaluru",
      "total_demand": 300,
      "growth": 12.5,
      "supply_capacity": 187.2,
      "pop_density": 0.83,
      "access_difficulty": 0.41,
      "demand_supply_ratio": 1.6,
      "need_score": 71.3
    }
  ]
}
```

With `--reference`, the output is compared to a previous output (ignoring
`last_updated`) and the program fails if they differ. With `--audit`, the canonical
districts of each state and the districts with an unusually high volume
(more than 3 standard deviations above the mean) are logged.

 */
