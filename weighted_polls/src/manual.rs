/*!

This is the long-form manual for `weighted_polls` and `pollw`.

## Inputs

Two sources are needed: the population estimates of the municipalities, and
one or more poll files.

### Population estimates

The spreadsheet published yearly by IBGE (`estimativa_dou_<year>.xls`). By
default `pollw` downloads the 2024 edition and keeps a copy of the extracted
records in a cache file. Both the legacy `.xls` format and `.xlsx` are read.

The layout is positional:

- the data is on the **second** worksheet (the first one is a cover page);
- the first two non-empty rows are titles and are skipped;
- column A holds the state code, column D the municipality name and column E
  the population.

|     | A (UF) | B     | C     | D (municipality) | E (population) |
|-----|--------|-------|-------|------------------|----------------|
| ... | SP     | 35    | 00105 | Adamantina       | 34 687         |

Rows missing one of the three values are skipped. A population that is not a
number (footnote markers, for example) is kept as unknown, and the
municipality is weighted as tier 4.

### Poll files

Comma-separated values with a header row. The default column names are:

```text
ID_PESQUISA,DATA_PESQUISA,MUNICÍPIO,ESTADO,INTENÇÃO DE VOTO
P-0001,01/03/2024,Adamantina,SP,A
P-0002,01/03/2024,Campinas,SP,B
```

Column names must match exactly (no trimming, no case folding). Any row in
which one of the cells is exactly `#N/D` is dropped, as are rows with a
missing value. The voting intention is expected to be `A` or `B`; other values
are kept but do not count.

The text is expected in UTF-8. Files exported by spreadsheet software in
`windows-1252` are supported with the `encoding` option; the labels `latin1`
and `iso-8859-1` are read the same way, as browsers do.

## Weighting

Every municipality is put in a tier according to its population:

| tier | population          | weight |
|------|---------------------|--------|
| 1    | up to 20 000        | 1      |
| 2    | up to 100 000       | 2      |
| 3    | up to 1 000 000     | 3      |
| 4    | more than 1 000 000 | 4      |

For each date of a poll file, the weights of the municipalities voting `A` and
`B` are summed and each side gets `100 * side / total`, with two decimals. Poll
rows whose municipality is not found (the match on name and state is exact)
are not counted at all. If no row of a date can be counted, both shares are
`NaN`.

Each poll file produces entries sorted by date. The entries of a new file are
added **after** the entries already computed, even if they are older. Dates are
never merged between files.

## Configuration

`pollw` comes with sensible defaults, and all of them can be changed with a
JSON configuration file:

```json
{
  "outputSettings": { "title": "Pesquisa 2024", "outputPath": "series.json" },
  "municipalitySource": {
    "url": "https://ftp.ibge.gov.br/Estimativas_de_Populacao/Estimativas_2024/estimativa_dou_2024.xls",
    "cachePath": "public/data/municipalities.json",
    "forceRefresh": false,
    "timeoutSeconds": 60
  },
  "pollFileSources": [ { "filePath": "poll_week1.csv", "encoding": "utf-8" } ],
  "pollFormat": { "notAvailableLabel": "#N/D" },
  "rules": {
    "dateGrouping": "canonical",
    "dateOrder": "dayFirst",
    "emptyGroups": "emitNaN",
    "tierWeights": [1, 2, 3, 4]
  }
}
```

Options:
 - `municipalitySource.filePath` (string, optional): read the estimates from a
   local file instead of downloading them.
 - `pollFormat.columns` (object, optional): the names of the `searchId`, `date`,
   `municipality`, `state` and `vote` columns.
 - `rules.dateGrouping`: `canonical` groups the rows by calendar day
   (`01/02/2024` and `1/2/2024` are the same day); `rawString` groups them by
   the exact text of the date.
 - `rules.dateOrder`: `dayFirst` or `monthFirst`, to read dates like `01/02/2024`.
 - `rules.emptyGroups`: `emitNaN` or `omit` for the dates without any counted row.
 - `rules.tierWeights`: the weights of tiers 1 to 4.

Relative paths are resolved from the directory of the configuration file.

 */
