use crate::config::PricingConfig;
use crate::models::booking::Fare;

pub fn fare_for(pricing: &PricingConfig, distance_km: f64) -> Fare {
    let distance_charge = pricing.price_per_km * distance_km;
    Fare {
        distance_km,
        base_amount: pricing.base_price,
        distance_charge,
        handling_fee: pricing.handling_fee,
        total: pricing.base_price + distance_charge + pricing.handling_fee,
    }
}
