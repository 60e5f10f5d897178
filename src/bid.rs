//! Volume and price bid tables, merged into per-band bid records.
use crate::error::DispatchError;
use crate::service::Service;
use crate::unit::DispatchType;
use serde::Deserialize;

/// Number of bid bands a unit/service/dispatch_type may offer.
pub const NUM_BANDS: usize = 10;

fn default_service() -> Service {
    Service::default_service()
}

fn default_dispatch_type() -> DispatchType {
    DispatchType::default_dispatch_type()
}

/// One row of the volume bid table: up to ten MW volumes, any band absent
/// (`None`) treated as zero.
#[derive(Debug, Clone, Deserialize)]
pub struct VolumeBidRow {
    pub unit: String,
    #[serde(default = "default_service")]
    pub service: Service,
    #[serde(default = "default_dispatch_type")]
    pub dispatch_type: DispatchType,
    #[serde(rename = "1", default)]
    pub band_1: Option<f64>,
    #[serde(rename = "2", default)]
    pub band_2: Option<f64>,
    #[serde(rename = "3", default)]
    pub band_3: Option<f64>,
    #[serde(rename = "4", default)]
    pub band_4: Option<f64>,
    #[serde(rename = "5", default)]
    pub band_5: Option<f64>,
    #[serde(rename = "6", default)]
    pub band_6: Option<f64>,
    #[serde(rename = "7", default)]
    pub band_7: Option<f64>,
    #[serde(rename = "8", default)]
    pub band_8: Option<f64>,
    #[serde(rename = "9", default)]
    pub band_9: Option<f64>,
    #[serde(rename = "10", default)]
    pub band_10: Option<f64>,
}

/// One row of the price bid table: the same keys as [`VolumeBidRow`], with
/// $/MW prices that must be row-wise non-decreasing.
#[derive(Debug, Clone, Deserialize)]
pub struct PriceBidRow {
    pub unit: String,
    #[serde(default = "default_service")]
    pub service: Service,
    #[serde(default = "default_dispatch_type")]
    pub dispatch_type: DispatchType,
    #[serde(rename = "1", default)]
    pub band_1: Option<f64>,
    #[serde(rename = "2", default)]
    pub band_2: Option<f64>,
    #[serde(rename = "3", default)]
    pub band_3: Option<f64>,
    #[serde(rename = "4", default)]
    pub band_4: Option<f64>,
    #[serde(rename = "5", default)]
    pub band_5: Option<f64>,
    #[serde(rename = "6", default)]
    pub band_6: Option<f64>,
    #[serde(rename = "7", default)]
    pub band_7: Option<f64>,
    #[serde(rename = "8", default)]
    pub band_8: Option<f64>,
    #[serde(rename = "9", default)]
    pub band_9: Option<f64>,
    #[serde(rename = "10", default)]
    pub band_10: Option<f64>,
}

fn bands(row: &VolumeBidRow) -> [Option<f64>; NUM_BANDS] {
    [
        row.band_1, row.band_2, row.band_3, row.band_4, row.band_5, row.band_6, row.band_7,
        row.band_8, row.band_9, row.band_10,
    ]
}

fn price_bands(row: &PriceBidRow) -> [Option<f64>; NUM_BANDS] {
    [
        row.band_1, row.band_2, row.band_3, row.band_4, row.band_5, row.band_6, row.band_7,
        row.band_8, row.band_9, row.band_10,
    ]
}

/// A single non-zero bid band, after merging volume and price tables.
#[derive(Debug, Clone, PartialEq)]
pub struct BidBand {
    pub unit: String,
    pub dispatch_type: DispatchType,
    pub service: Service,
    /// Band index, 1..=10.
    pub band: u8,
    pub volume: f64,
    pub price: f64,
}

/// Merge the volume and price bid tables into a flat list of non-zero bid
/// bands.
///
/// Validates that volumes are non-negative and that prices are row-wise
/// non-decreasing (spec §7 Schema errors). A band with zero or absent
/// volume is dropped (it produces no decision variable, per §3).
pub fn merge_bids(
    volumes: &[VolumeBidRow],
    prices: &[PriceBidRow],
) -> Result<Vec<BidBand>, DispatchError> {
    let mut out = Vec::new();
    for vrow in volumes {
        let vbands = bands(vrow);

        let mut prev = f64::NEG_INFINITY;
        let prow = prices.iter().find(|p| {
            p.unit == vrow.unit && p.service == vrow.service && p.dispatch_type == vrow.dispatch_type
        });
        let Some(prow) = prow else {
            return Err(DispatchError::ordering(format!(
                "price bid missing for unit \"{}\" before volume bid was used",
                vrow.unit
            )));
        };
        let pbands = price_bands(prow);

        for (i, volume) in vbands.iter().enumerate() {
            let Some(volume) = *volume else { continue };
            if volume == 0.0 {
                continue;
            }
            if volume < 0.0 || !volume.is_finite() {
                return Err(DispatchError::schema(
                    "volume_bids",
                    vrow.unit.clone(),
                    format!("band {} volume {volume} is not a finite non-negative number", i + 1),
                ));
            }

            let Some(price) = pbands[i] else {
                return Err(DispatchError::schema(
                    "price_bids",
                    vrow.unit.clone(),
                    format!("band {} has a volume but no price", i + 1),
                ));
            };
            if !price.is_finite() {
                return Err(DispatchError::schema(
                    "price_bids",
                    vrow.unit.clone(),
                    format!("band {} price {price} is not finite", i + 1),
                ));
            }
            if price < prev {
                return Err(DispatchError::schema(
                    "price_bids",
                    vrow.unit.clone(),
                    format!("band {} price {price} is below the previous band's price {prev}", i + 1),
                ));
            }
            prev = price;

            out.push(BidBand {
                unit: vrow.unit.clone(),
                dispatch_type: vrow.dispatch_type,
                service: vrow.service,
                band: u8::try_from(i + 1).unwrap(),
                volume,
                price,
            });
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn volume_row(unit: &str, bands: [Option<f64>; NUM_BANDS]) -> VolumeBidRow {
        VolumeBidRow {
            unit: unit.to_string(),
            service: Service::Energy,
            dispatch_type: DispatchType::Generator,
            band_1: bands[0],
            band_2: bands[1],
            band_3: bands[2],
            band_4: bands[3],
            band_5: bands[4],
            band_6: bands[5],
            band_7: bands[6],
            band_8: bands[7],
            band_9: bands[8],
            band_10: bands[9],
        }
    }

    fn price_row(unit: &str, bands: [Option<f64>; NUM_BANDS]) -> PriceBidRow {
        PriceBidRow {
            unit: unit.to_string(),
            service: Service::Energy,
            dispatch_type: DispatchType::Generator,
            band_1: bands[0],
            band_2: bands[1],
            band_3: bands[2],
            band_4: bands[3],
            band_5: bands[4],
            band_6: bands[5],
            band_7: bands[6],
            band_8: bands[7],
            band_9: bands[8],
            band_10: bands[9],
        }
    }

    #[test]
    fn test_merge_drops_zero_volume_bands() {
        let mut vb = [None; NUM_BANDS];
        vb[0] = Some(20.0);
        vb[1] = Some(0.0);
        let mut pb = [None; NUM_BANDS];
        pb[0] = Some(50.0);
        pb[1] = Some(60.0);

        let volumes = vec![volume_row("A", vb)];
        let prices = vec![price_row("A", pb)];
        let bands = merge_bids(&volumes, &prices).unwrap();
        assert_eq!(bands.len(), 1);
        assert_eq!(bands[0].band, 1);
        assert_eq!(bands[0].volume, 20.0);
        assert_eq!(bands[0].price, 50.0);
    }

    #[test]
    fn test_merge_rejects_non_monotonic_price() {
        let mut vb = [None; NUM_BANDS];
        vb[0] = Some(10.0);
        vb[1] = Some(10.0);
        let mut pb = [None; NUM_BANDS];
        pb[0] = Some(50.0);
        pb[1] = Some(40.0);

        let volumes = vec![volume_row("A", vb)];
        let prices = vec![price_row("A", pb)];
        assert!(merge_bids(&volumes, &prices).is_err());
    }

    #[test]
    fn test_merge_rejects_negative_volume() {
        let mut vb = [None; NUM_BANDS];
        vb[0] = Some(-5.0);
        let mut pb = [None; NUM_BANDS];
        pb[0] = Some(50.0);

        let volumes = vec![volume_row("A", vb)];
        let prices = vec![price_row("A", pb)];
        assert!(merge_bids(&volumes, &prices).is_err());
    }
}
