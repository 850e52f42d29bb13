// src/services/pricing.rs
//
// Motor de preços: funções puras sobre Decimal. O preço de venda parte do
// preço de compra mais a margem escolhida, recebe os fatores fixos de
// comissão (2%) e IVA (15%) e é arredondado para décimos "bonitos".

use rust_decimal::{Decimal, RoundingStrategy};

// Percentuais oferecidos como degraus de margem rápidos.
pub const MARGIN_TIERS: [u32; 6] = [10, 20, 30, 38, 45, 48];

// Margem sugerida quando o usuário ainda não escolheu nenhuma.
pub const DEFAULT_MARGIN: u32 = 38;

// Fator de comissão aplicado sobre a base com margem.
fn handling_factor() -> Decimal {
    Decimal::new(102, 2) // 1.02
}

// Fator de IVA aplicado sobre a base com margem.
fn tax_factor() -> Decimal {
    Decimal::new(115, 2) // 1.15
}

/// Preço de venda a partir do preço de compra e da margem (%).
/// Retorna 0 quando qualquer entrada é <= 0.
pub fn price_from_margin(purchase_price: Decimal, margin_percent: Decimal) -> Decimal {
    if purchase_price <= Decimal::ZERO || margin_percent <= Decimal::ZERO {
        return Decimal::ZERO;
    }

    let base = purchase_price * (Decimal::ONE + margin_percent / Decimal::ONE_HUNDRED);
    round_price(base * handling_factor() * tax_factor())
}

/// Arredonda um preço para o décimo "estético" mais próximo.
///
/// A parte decimal é escalada para décimos; se o resto fracionário do valor
/// escalado é menor que 0.5 arredondamos para baixo, senão para cima. O
/// resultado sempre termina em múltiplos de 0.1, nunca de 0.01.
pub fn round_price(price: Decimal) -> Decimal {
    if price <= Decimal::ZERO {
        return Decimal::ZERO;
    }

    let whole = price.floor();
    let fraction = price - whole;

    let tenths = (fraction * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        / Decimal::TEN;
    let remainder = tenths - tenths.floor();

    if remainder < Decimal::new(5, 1) && tenths > Decimal::ZERO {
        whole + tenths.floor() / Decimal::TEN
    } else {
        whole + tenths.ceil() / Decimal::TEN
    }
}

/// Encontra o degrau de margem cujo preço calculado fica mais perto do
/// preço de venda informado.
///
/// Diferenças abaixo de 0.01 contam como correspondência exata e encerram a
/// busca. Se nem a menor diferença fica dentro da tolerância de 0.05, nenhum
/// degrau corresponde e o resultado é None.
pub fn nearest_margin_tier(purchase_price: Decimal, sale_price: Decimal) -> Option<Decimal> {
    if purchase_price <= Decimal::ZERO || sale_price <= Decimal::ZERO {
        return None;
    }

    let exact_tolerance = Decimal::new(1, 2); // 0.01
    let match_tolerance = Decimal::new(5, 2); // 0.05

    let mut nearest: Option<Decimal> = None;
    let mut smallest_diff = Decimal::MAX;

    for tier in MARGIN_TIERS {
        let tier = Decimal::from(tier);
        let candidate = price_from_margin(purchase_price, tier);
        let diff = (sale_price - candidate).abs();

        if diff < exact_tolerance {
            return Some(tier);
        }

        if diff < smallest_diff {
            smallest_diff = diff;
            nearest = Some(tier);
        }
    }

    if smallest_diff > match_tolerance {
        return None;
    }
    nearest
}

/// Margem bruta real entre compra e venda, sem fatores.
pub fn gross_margin_percent(purchase_price: Decimal, sale_price: Decimal) -> Decimal {
    if purchase_price <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (sale_price - purchase_price) / purchase_price * Decimal::ONE_HUNDRED
}

/// Preço de venda sugerido com a margem padrão (38%).
pub fn suggested_sale_price(purchase_price: Decimal) -> Decimal {
    price_from_margin(purchase_price, Decimal::from(DEFAULT_MARGIN))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn price_from_margin_applies_factors_and_rounds() {
        // 10 * 1.38 = 13.80; * 1.02 = 14.076; * 1.15 = 16.1874 -> 16.2
        assert_eq!(price_from_margin(dec("10"), dec("38")), dec("16.2"));
    }

    #[test]
    fn price_from_margin_rejects_non_positive_inputs() {
        assert_eq!(price_from_margin(Decimal::ZERO, dec("38")), Decimal::ZERO);
        assert_eq!(price_from_margin(dec("-5"), dec("38")), Decimal::ZERO);
        assert_eq!(price_from_margin(dec("10"), Decimal::ZERO), Decimal::ZERO);
        assert_eq!(price_from_margin(dec("10"), dec("-10")), Decimal::ZERO);
    }

    #[test]
    fn round_price_lands_on_tenths() {
        assert_eq!(round_price(dec("12.34")), dec("12.3"));
        assert_eq!(round_price(dec("12.36")), dec("12.4"));
        assert_eq!(round_price(dec("12.35")), dec("12.4"));
        assert_eq!(round_price(dec("12.00")), dec("12"));
        assert_eq!(round_price(Decimal::ZERO), Decimal::ZERO);
        assert_eq!(round_price(dec("-3.5")), Decimal::ZERO);
    }

    #[test]
    fn round_price_is_idempotent() {
        for raw in ["0.07", "1.23", "7.77", "12.35", "99.99", "1540.04"] {
            let once = round_price(dec(raw));
            assert_eq!(round_price(once), once, "falhou para {}", raw);
        }
    }

    #[test]
    fn nearest_tier_round_trips_every_margin() {
        // Propriedade central: o degrau mais próximo do preço calculado
        // recupera a margem original. Vale para preços de compra onde os
        // degraus arredondados ainda são distintos (acima de ~3 os degraus
        // vizinhos 45/48 deixam de colidir no décimo).
        for purchase in ["4.75", "10", "37.45", "120.99"] {
            let purchase = dec(purchase);
            for tier in MARGIN_TIERS {
                let tier = Decimal::from(tier);
                let sale = price_from_margin(purchase, tier);
                assert_eq!(
                    nearest_margin_tier(purchase, sale),
                    Some(tier),
                    "falhou para compra {} margem {}",
                    purchase,
                    tier
                );
            }
        }
    }

    #[test]
    fn nearest_tier_outside_tolerance_is_none() {
        // 16.2 é o preço do degrau 38 para compra 10; um preço bem distante
        // de todos os degraus não corresponde a nenhum.
        assert_eq!(nearest_margin_tier(dec("10"), dec("99.9")), None);
        assert_eq!(nearest_margin_tier(Decimal::ZERO, dec("10")), None);
        assert_eq!(nearest_margin_tier(dec("10"), Decimal::ZERO), None);
    }

    #[test]
    fn gross_margin_is_plain_ratio() {
        assert_eq!(gross_margin_percent(dec("10"), dec("15")), dec("50"));
        assert_eq!(gross_margin_percent(Decimal::ZERO, dec("15")), Decimal::ZERO);
    }

    #[test]
    fn suggested_price_uses_default_margin() {
        assert_eq!(
            suggested_sale_price(dec("10")),
            price_from_margin(dec("10"), dec("38"))
        );
    }
}
