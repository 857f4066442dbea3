/*!

This is the long-form manual for `tax_compliance` and `kepatuhan`.

## Input layout

The input is one sheet of an Excel workbook (`.xlsx`). The first row holds the
column labels, every following row describes one taxpayer (*wajib pajak*, WP).

Column labels are compared after normalization: surrounding spaces are
removed, the label is upper-cased and line breaks inside the label become
spaces. `Nama OP`, ` NAMA OP ` and `Nama\nOP` are all the same column.

Three columns are required:

* `TMT`: the registration date of the taxpayer. Excel dates, `2024-01-15`,
  `15/01/2024` or `15 Januari 2024` are all accepted. Values that are not dates
  are kept as missing dates, the row is still processed.
* `NAMA OP`: the name of the taxpayer.
* `STATUS`: the status of the taxpayer. It is passed through unchanged.

The monthly payments are all the columns whose label contains the tax year
(`JAN 2024`, `PEMBAYARAN FEB 2024`, ...) and whose values are all numbers.
Empty cells are allowed and count as no payment. A column with a single text
value (`-`, `lunas`) is not a payment column.

Example for the tax year 2024:

| TMT | NAMA OP | STATUS | JAN 2024 | FEB 2024 | ... | DES 2024 |
|-----|---------|--------|----------|----------|-----|----------|
| 2019-03-01 | CV MAJU JAYA | AKTIF | 150000 | 0 | ... | 150000 |

`kepatuhan --template` writes a complete example workbook.

## Indicators

The following columns are added to the table:

* `TAHUN TMT`: the year of `TMT`.
* `TOTAL PEMBAYARAN`: the sum of the payments.
* `BULAN PEMBAYARAN`: the number of months with a payment above zero.
* `BULAN AKTIF`: always 12.
* `RATA-RATA PEMBAYARAN`: the total divided by the number of months paid (by 1
  when no month was paid).
* `KEPATUHAN (%)`: the number of months paid divided by 12, in percent.
* `KLASIFIKASI KEPATUHAN`:
  * `Kurang Patuh` up to 33.333%,
  * `Cukup Patuh` up to 66.666%,
  * `Patuh` above.

When no payment column is found, only `TAHUN TMT` is added. The program then
prints a warning and skips the rankings and the charts that need payments.

## Configuration

All the options of `kepatuhan` can also be provided in a JSON file with the
`--config` flag. Options given on the command line take precedence.

```json
{
  "inputFile": "setoran.xlsx",
  "sheetName": "Sheet1",
  "taxYear": 2024,
  "outputDirectory": "out",
  "exportFile": "hasil_dashboard_kepatuhan.xlsx",
  "topN": 20
}
```

Relative paths are resolved against the directory of the configuration file.
*/
