use super::*;

fn text(s: &str) -> Option<RawValue> {
    Some(RawValue::text(s))
}

fn num(n: f64) -> Option<RawValue> {
    Some(RawValue::Number(n))
}

// -----------------------------------------------------------------------
// bathrooms
// -----------------------------------------------------------------------

#[test]
fn bathrooms_mixed_fraction_with_space() {
    let record = normalize(PartialRecord {
        bathrooms: text("2 1/2"),
        ..PartialRecord::default()
    });
    assert_eq!(record.bathrooms, num(2.5));
}

#[test]
fn bathrooms_mixed_fraction_with_hyphen() {
    assert_eq!(parse_bathrooms("2-1/2"), Some(2.5));
    assert_eq!(parse_bathrooms("3 3/4 baths"), Some(3.75));
}

#[test]
fn bathrooms_whole_plus_half_count() {
    let record = normalize(PartialRecord {
        bathrooms: text("2bath1half"),
        ..PartialRecord::default()
    });
    assert_eq!(record.bathrooms, num(2.5));
    assert_eq!(parse_bathrooms("3 full baths and 2 half"), Some(4.0));
}

#[test]
fn bathrooms_full_and_half_without_bath_word() {
    assert_eq!(parse_bathrooms("2 full, 1 half"), Some(2.5));
    assert_eq!(parse_bathrooms("2 full 1 half"), Some(2.5));
    assert_eq!(parse_bathrooms("2 ba, 1 half"), Some(2.5));
}

#[test]
fn bathrooms_bare_half() {
    assert_eq!(parse_bathrooms("1/2"), Some(0.5));
    assert_eq!(parse_bathrooms("1/0"), None);
}

#[test]
fn bathrooms_plain_decimal() {
    assert_eq!(parse_bathrooms("2.5 ba"), Some(2.5));
    assert_eq!(parse_bathrooms("3"), Some(3.0));
}

#[test]
fn bathrooms_zero_denominator_is_null() {
    assert_eq!(parse_bathrooms("2 1/0"), None);
}

#[test]
fn bathrooms_without_digits_is_null() {
    assert_eq!(parse_bathrooms("n/a"), None);
    assert_eq!(parse_bathrooms("   "), None);
}

// -----------------------------------------------------------------------
// price / square feet
// -----------------------------------------------------------------------

#[test]
fn price_strips_currency_and_separators() {
    let record = normalize(PartialRecord {
        price: text("$750,000"),
        ..PartialRecord::default()
    });
    assert_eq!(record.price, num(750_000.0));
}

#[test]
fn square_feet_strips_units() {
    let record = normalize(PartialRecord {
        square_feet: text("1,800 sq ft"),
        ..PartialRecord::default()
    });
    assert_eq!(record.square_feet, num(1800.0));
    assert_eq!(parse_decimal("1,800 sq. ft."), Some(1800.0));
}

#[test]
fn price_keeps_decimal_precision() {
    assert_eq!(parse_decimal("$1,234.50"), Some(1234.5));
}

#[test]
fn price_magnitude_suffixes_scale() {
    let record = normalize(PartialRecord {
        price: text("$1.2M"),
        ..PartialRecord::default()
    });
    assert_eq!(record.price, num(1_200_000.0));
    assert_eq!(parse_price("$850K"), Some(850_000.0));
    assert_eq!(parse_price("$850k"), Some(850_000.0));
    assert_eq!(parse_price("$2.5 million"), Some(2_500_000.0));
    assert_eq!(parse_price("$750,000"), Some(750_000.0));
}

#[test]
fn price_range_keeps_the_lower_bound() {
    assert_eq!(parse_price("$500,000 - $550,000"), Some(500_000.0));
    assert_eq!(parse_price("$500K to $550K"), Some(500_000.0));
    assert_eq!(parse_decimal("1,800-2,000 sq ft"), Some(1800.0));
}

#[test]
fn magnitude_words_do_not_scale_square_feet() {
    let record = normalize(PartialRecord {
        square_feet: text("1,950 sqft"),
        ..PartialRecord::default()
    });
    assert_eq!(record.square_feet, num(1950.0));
}

#[test]
fn unparsable_decimal_is_null() {
    assert_eq!(parse_decimal("Contact agent"), None);
    assert_eq!(parse_decimal("1.2.3"), None);
}

// -----------------------------------------------------------------------
// bedrooms / year built
// -----------------------------------------------------------------------

#[test]
fn bedrooms_strip_non_digits() {
    let record = normalize(PartialRecord {
        bedrooms: text("3 bd"),
        year_built: text("Built in 1998"),
        ..PartialRecord::default()
    });
    assert_eq!(record.bedrooms, num(3.0));
    assert_eq!(record.year_built, num(1998.0));
}

#[test]
fn decimal_text_for_integer_field_is_truncated() {
    assert_eq!(parse_integer("3.0"), Some(3.0));
}

#[test]
fn bedroom_range_keeps_the_lower_bound() {
    assert_eq!(parse_integer("3-4 beds"), Some(3.0));
}

#[test]
fn empty_strings_become_null() {
    let record = normalize(PartialRecord {
        bedrooms: text(""),
        bathrooms: text(""),
        square_feet: text(""),
        price: text(""),
        year_built: text(""),
        ..PartialRecord::default()
    });
    assert!(record.bedrooms.is_none());
    assert!(record.bathrooms.is_none());
    assert!(record.square_feet.is_none());
    assert!(record.price.is_none());
    assert!(record.year_built.is_none());
}

// -----------------------------------------------------------------------
// pass-through and idempotence
// -----------------------------------------------------------------------

#[test]
fn numbers_pass_through_unchanged() {
    let record = normalize(PartialRecord {
        bathrooms: num(1.75),
        price: num(899_000.0),
        ..PartialRecord::default()
    });
    assert_eq!(record.bathrooms, num(1.75));
    assert_eq!(record.price, num(899_000.0));
}

#[test]
fn non_finite_numbers_become_null() {
    let record = normalize(PartialRecord {
        price: num(f64::NAN),
        square_feet: num(f64::INFINITY),
        ..PartialRecord::default()
    });
    assert!(record.price.is_none());
    assert!(record.square_feet.is_none());
}

#[test]
fn other_fields_are_untouched() {
    let record = normalize(PartialRecord {
        address: Some("1 Main St".to_string()),
        features: vec!["Pool".to_string()],
        ..PartialRecord::default()
    });
    assert_eq!(record.address.as_deref(), Some("1 Main St"));
    assert_eq!(record.features, vec!["Pool"]);
}

#[test]
fn normalize_is_idempotent() {
    let samples = vec![
        PartialRecord {
            bedrooms: text("4 beds"),
            bathrooms: text("2 1/2"),
            square_feet: text("2,150 sqft"),
            price: text("$1.25M"),
            year_built: text("1925"),
            ..PartialRecord::default()
        },
        PartialRecord {
            bathrooms: text("1bath1half"),
            price: text("call"),
            square_feet: num(f64::NAN),
            ..PartialRecord::default()
        },
        PartialRecord::default(),
    ];
    for sample in samples {
        let once = normalize(sample);
        let twice = normalize(once.clone());
        assert_eq!(once, twice);
    }
}
