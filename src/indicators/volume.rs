// Volume overlay: the raw bar volume re-projected as an indicator series so
// the renderer can treat it like any other overlay.

use crate::error::ChartError;
use crate::indicators::IndicatorSeries;
use crate::market_data::ValidatedSeries;
use crate::types::SeriesKey;

pub fn volume_series(series: &ValidatedSeries) -> Result<IndicatorSeries, ChartError> {
    let values = series.volumes().into_iter().map(Some).collect();
    IndicatorSeries::from_values(SeriesKey::Volume, &series.timestamps(), values)
}
