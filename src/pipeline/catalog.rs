//! Built-in BRFSS 2015 rule table

use super::registry::FieldRegistry;
use super::rules::{Band, Decode, FieldRule, LabelRule, Transform};
use super::value::Marker;

pub const STANDARD_VERSION: &str = "brfss-2015.3";

const DK_REFUSED_1: &[i64] = &[7, 9];
const DK_REFUSED_2: &[i64] = &[77, 99];
const DK_REFUSED_3: &[i64] = &[777, 999];

/// Yes/no questions coded 1 = Yes, 2 = No.
const YES_NO: &[(&str, &str)] = &[
    ("HLTHPLN1", "Has any kind of health care coverage"),
    ("MEDCOST", "Could not see a doctor because of cost in the past 12 months"),
    ("BPMEDS", "Currently taking blood pressure medication"),
    ("BLOODCHO", "Ever had blood cholesterol checked"),
    ("TOLDHI2", "Ever told blood cholesterol is high"),
    ("CVDINFR4", "Ever diagnosed with a heart attack"),
    ("ASTHMA3", "Ever told had asthma"),
    ("ASTHNOW", "Still has asthma"),
    ("CHCSCNCR", "Ever told had skin cancer"),
    ("CHCOCNCR", "Ever told had any other type of cancer"),
    ("CHCCOPD1", "Ever told had COPD, emphysema or chronic bronchitis"),
    ("ADDEPEV2", "Ever told had a depressive disorder"),
    ("VETERAN3", "Ever served on active duty"),
    ("INTERNET", "Used the internet in the past 30 days"),
    ("QLACTLM2", "Limited in activities by a physical, mental or emotional problem"),
    ("USEEQUIP", "Health problem requires special equipment"),
    ("DECIDE", "Serious difficulty concentrating, remembering or deciding"),
    ("DIFFWALK", "Serious difficulty walking or climbing stairs"),
    ("DIFFDRES", "Difficulty dressing or bathing"),
    ("DIFFALON", "Difficulty doing errands alone"),
    ("SMOKE100", "Smoked at least 100 cigarettes in entire life"),
    ("STOPSMK2", "Stopped smoking for a day or longer in the past 12 months"),
    ("LMTJOIN3", "Limited because of joint symptoms"),
    ("ARTHDIS2", "Joint symptoms affect whether or how much you work"),
    ("FLUSHOT6", "Flu vaccine in the past 12 months"),
    ("PNEUVAC3", "Ever had a pneumonia shot"),
    ("HIVTST6", "Ever tested for HIV"),
    ("PDIABTST", "Tested for high blood sugar in the past three years"),
    ("INSULIN", "Now taking insulin"),
    ("DIABEYE", "Ever told diabetes has affected eyes"),
    ("CIMEMLOS", "Confusion or memory loss in the past 12 months"),
    ("_RFHLTH", "Adults with good or better health"),
    ("_HCVU651", "Respondents aged 18-64 with health care coverage"),
    ("_CHOLCHK", "Cholesterol checked within the past five years"),
    ("_DRDXAR1", "Respondents diagnosed with arthritis"),
    ("_HISPANC", "Hispanic, Latino/a or Spanish origin"),
    ("_RACEG21", "White non-Hispanic"),
    ("_PASTAE1", "Met aerobic and strengthening guidelines"),
    ("_FLSHOT6", "Aged 65+ with a flu shot in the past year"),
    ("_PNEUMO2", "Aged 65+ who ever had a pneumonia vaccination"),
    ("_AIDTST3", "Ever been tested for HIV"),
    ("_FRTLT1", "Consumes fruit one or more times per day"),
    ("_VEGLT1", "Consumes vegetables one or more times per day"),
    ("PREGNANT", "Currently pregnant"),
    ("EXERANY2", "Any exercise in the past month"),
    ("_MICHD", "Ever reported coronary heart disease or myocardial infarction"),
    ("DRNKANY5", "Had at least one drink in the past 30 days"),
    ("_PAINDX1", "Met aerobic recommendations"),
    ("_PASTRNG", "Met muscle strengthening recommendations"),
];

/// Calculated risk flags coded 1 = No, 2 = Yes.
const REVERSED_YES_NO: &[(&str, &str)] = &[
    ("_RFCHOL", "Told high cholesterol"),
    ("_LTASTH1", "Ever told had asthma"),
    ("_CASTHM1", "Currently has asthma"),
    ("_RFBING5", "Binge drinker"),
    ("_FRUITEX", "Fruit intake outside expected range"),
    ("_VEGETEX", "Vegetable intake outside expected range"),
    ("_RFDRHV5", "Heavy drinker"),
];

/// Calculated or physical measures taken as-is.
const PASSTHROUGH: &[(&str, &str)] = &[
    ("_FRUTSUM", "Total fruits consumed per day"),
    ("_VEGESUM", "Total vegetables consumed per day"),
    ("PADUR1_", "Minutes of first activity"),
    ("PADUR2_", "Minutes of second activity"),
    ("_MINAC11", "Minutes of physical activity per week for first activity"),
    ("_MINAC21", "Minutes of physical activity per week for second activity"),
    ("PAMIN11_", "Minutes of physical activity per week for first activity"),
    ("PAMIN21_", "Minutes of physical activity per week for second activity"),
    ("PAVIG11_", "Minutes of vigorous activity for first activity"),
    ("PAVIG21_", "Minutes of vigorous activity for second activity"),
    ("HTM4", "Reported height in centimeters"),
    ("_BMI5", "Body mass index"),
];

fn yes_no(name: &str, description: &str) -> FieldRule {
    labelled(name, description, &[(1, "Yes"), (2, "No")], DK_REFUSED_1)
}

fn reversed_yes_no(name: &str, description: &str) -> FieldRule {
    labelled(name, description, &[(1, "No"), (2, "Yes")], DK_REFUSED_1)
}

fn labelled(name: &str, description: &str, labels: &[(i64, &str)], unknown: &[i64]) -> FieldRule {
    grouped(
        name,
        description,
        &labels
            .iter()
            .map(|&(code, label)| (vec![code], label))
            .collect::<Vec<_>>(),
        unknown,
    )
}

fn grouped(name: &str, description: &str, labels: &[(Vec<i64>, &str)], unknown: &[i64]) -> FieldRule {
    let rule = FieldRule::new(
        name,
        Transform::Categorical {
            labels: labels
                .iter()
                .map(|(codes, label)| LabelRule {
                    codes: codes.clone(),
                    label: label.to_string(),
                })
                .collect(),
        },
    )
    .describe(description);
    with_unknown(rule, unknown)
}

fn with_unknown(rule: FieldRule, unknown: &[i64]) -> FieldRule {
    if unknown.is_empty() {
        rule
    } else {
        rule.sentinel(unknown, Marker::Unknown)
    }
}

fn bounded(name: &str, description: &str, min: Option<f64>, max: Option<f64>) -> FieldRule {
    FieldRule::new(name, Transform::Identity { min, max }).describe(description)
}

fn passthrough(name: &str, description: &str) -> FieldRule {
    bounded(name, description, None, None)
}

fn outcome(name: &str, description: &str, positive: &[i64], negative: &[i64]) -> FieldRule {
    FieldRule::new(
        name,
        Transform::Target {
            positive: positive.to_vec(),
            negative: negative.to_vec(),
        },
    )
    .describe(description)
    .sentinel(DK_REFUSED_1, Marker::Unknown)
}

fn composite(name: &str, description: &str, bands: Vec<Band>) -> FieldRule {
    FieldRule::new(name, Transform::NumericUnit { bands }).describe(description)
}

/// 1xx per day, 2xx per week, 3xx per month, 4xx per year; result per month.
fn per_month_with_year() -> Vec<Band> {
    vec![
        Band::new(101, 199, Decode::Remainder { factor: 30.0 }),
        Band::new(201, 299, Decode::Remainder { factor: 4.0 }),
        Band::new(301, 399, Decode::Remainder { factor: 1.0 }),
        Band::new(401, 499, Decode::RemainderPer { divisor: 12.0 }),
    ]
}

/// 1xx per day, 2xx per week, 3xx per month; result per month.
fn per_month() -> Vec<Band> {
    vec![
        Band::new(101, 199, Decode::Remainder { factor: 30.0 }),
        Band::new(201, 299, Decode::Remainder { factor: 4.0 }),
        Band::new(301, 399, Decode::Remainder { factor: 1.0 }),
    ]
}

/// 1xx per week, 2xx per month; result per month.
fn week_or_month() -> Vec<Band> {
    vec![
        Band::new(101, 199, Decode::Remainder { factor: 4.0 }),
        Band::new(201, 299, Decode::Remainder { factor: 1.0 }),
    ]
}

fn hours_minutes() -> Vec<Band> {
    vec![Band::new(0, 959, Decode::HoursMinutes)]
}

fn outcomes() -> Vec<FieldRule> {
    vec![
        outcome("BPHIGH4", "Ever told blood pressure is high", &[1, 2, 4], &[3]),
        outcome("DIABETE3", "Ever told you have diabetes", &[1, 2, 4], &[3]),
        outcome("CVDCRHD4", "Ever told you have angina or coronary heart disease", &[1], &[2]),
        outcome("CVDSTRK3", "Ever told you had a stroke", &[1], &[2]),
        outcome("CHCKIDNY", "Ever told you have kidney disease", &[1], &[2]),
    ]
}

fn categorical_fields() -> Vec<FieldRule> {
    let timing = [(1, "Within1Y"), (2, "Within2Y"), (3, "Within5Y"), (4, "Over5Y"), (8, "Never")];
    let frequency = [(1, "Daily"), (2, "Some"), (3, "Never")];
    let activity = [(0, "Low"), (1, "Moderate"), (2, "Vigorous")];
    let race = [
        (1, "White"),
        (2, "Black"),
        (3, "Native"),
        (4, "Asian"),
        (5, "Pacific"),
        (6, "Other"),
        (7, "Multi"),
    ];

    vec![
        labelled(
            "GENHLTH",
            "Self-rated general health",
            &[(1, "Excellent"), (2, "VeryGood"), (3, "Good"), (4, "Fair"), (5, "Poor")],
            DK_REFUSED_1,
        ),
        labelled(
            "PERSDOC2",
            "Has a personal doctor or health care provider",
            &[(1, "YesOne"), (2, "YesMulti"), (3, "No")],
            DK_REFUSED_1,
        ),
        labelled("CHECKUP1", "Time since last routine checkup", &timing, DK_REFUSED_1),
        labelled("CHOLCHK", "Time since blood cholesterol was last checked", &timing, DK_REFUSED_1),
        labelled(
            "MARITAL",
            "Marital status",
            &[(1, "Mar"), (2, "Div"), (3, "Wid"), (4, "Sep"), (5, "Nev"), (6, "UnP")],
            &[9],
        ),
        labelled(
            "EDUCA",
            "Highest grade or year of school completed",
            &[(1, "None"), (2, "Elem"), (3, "MidHS"), (4, "HS"), (5, "SomeCol"), (6, "ColGrad")],
            &[9],
        ),
        labelled(
            "RENTHOM1",
            "Own or rent home",
            &[(1, "Own"), (2, "Rent"), (3, "Other")],
            DK_REFUSED_1,
        ),
        labelled(
            "EMPLOY1",
            "Employment status",
            &[
                (1, "Employed"),
                (2, "SelfEmp"),
                (3, "Unemp1Y+"),
                (4, "Unemp<1Y"),
                (5, "Homemaker"),
                (6, "Student"),
                (7, "Retired"),
                (8, "Unable"),
            ],
            &[9],
        ),
        labelled(
            "INCOME2",
            "Annual household income",
            &[
                (1, "<10K"),
                (2, "10-15K"),
                (3, "15-20K"),
                (4, "20-25K"),
                (5, "25-35K"),
                (6, "35-50K"),
                (7, "50-75K"),
                (8, "75K+"),
            ],
            DK_REFUSED_2,
        ),
        labelled(
            "LASTSMK2",
            "Time since last smoked cigarettes",
            &[
                (1, "Within1M"),
                (2, "Within3M"),
                (3, "Within6M"),
                (4, "Within1Y"),
                (5, "Within5Y"),
                (6, "Within10Y"),
                (7, "Y10plus"),
                (8, "Never"),
            ],
            &[9, 99],
        ),
        labelled("USENOW3", "Uses chewing tobacco, snuff or snus", &frequency, DK_REFUSED_1),
        labelled(
            "ARTHSOCL",
            "Joint symptoms interfere with social activities",
            &[(1, "High"), (2, "Moderate"), (3, "No")],
            DK_REFUSED_1,
        ),
        labelled(
            "WHRTST10",
            "Where the last HIV test was taken",
            &[
                (1, "Private"),
                (2, "Center"),
                (3, "Inpatient"),
                (4, "Clinic"),
                (5, "Prison"),
                (6, "DrugTx"),
                (7, "Home"),
                (8, "Other"),
                (9, "ER"),
            ],
            DK_REFUSED_2,
        ),
        labelled(
            "SXORIENT",
            "Sexual orientation",
            &[(1, "Hetero"), (2, "LG"), (3, "Bi"), (4, "Other")],
            DK_REFUSED_1,
        ),
        labelled(
            "MSCODE",
            "Metropolitan status code",
            &[(1, "Central"), (2, "Fringe"), (3, "Suburban"), (5, "NonMSA")],
            &[],
        ),
        labelled(
            "_ASTHMS1",
            "Computed asthma status",
            &[(1, "Current"), (2, "Former"), (3, "Never")],
            &[9],
        ),
        labelled("_MRACE1", "Multiracial race categorization", &race, DK_REFUSED_2),
        labelled(
            "_RACE",
            "Computed race-ethnicity grouping",
            &[
                (1, "White"),
                (2, "Black"),
                (3, "Native"),
                (4, "Asian"),
                (5, "PacificI"),
                (6, "Other"),
                (7, "Multi"),
                (8, "Hispanic"),
            ],
            &[9],
        ),
        labelled(
            "_INCOMG",
            "Computed income categories",
            &[(1, "<15K"), (2, "15-25K"), (3, "25-35K"), (4, "35-50K"), (5, "50K+")],
            &[9],
        ),
        labelled("ACTIN11_", "Intensity of first activity", &activity, &[]),
        labelled("ACTIN21_", "Intensity of second activity", &activity, &[]),
        labelled(
            "_PA300R2",
            "Aerobic minutes per week, three levels (300)",
            &[(1, "300plus"), (2, "1to299"), (3, "None")],
            &[9],
        ),
        labelled(
            "_PAREC1",
            "Aerobic and strengthening guideline status",
            &[(1, "BothMet"), (2, "AerobicOnly"), (3, "StrengthOnly"), (4, "Neither")],
            &[9],
        ),
        labelled(
            "_BMI5CAT",
            "Body mass index category",
            &[(1, "Underweight"), (2, "Normal"), (3, "Overweight"), (4, "Obese")],
            &[],
        ),
        labelled(
            "_PA150R2",
            "Aerobic minutes per week, three levels (150)",
            &[(1, "150plus"), (2, "1to149"), (3, "None")],
            &[9],
        ),
        labelled("SEX", "Respondent sex", &[(1, "male"), (2, "female")], &[]),
        labelled("SMOKDAY2", "Frequency of days now smoking", &frequency, DK_REFUSED_1),
        labelled(
            "_SMOKER3",
            "Four-level smoker status",
            &[(1, "Daily"), (2, "Some"), (3, "Former"), (4, "Never")],
            &[9],
        ),
        labelled(
            "_PACAT1",
            "Physical activity categories",
            &[(1, "VeryActive"), (2, "Active"), (3, "Insufficient"), (4, "Inactive")],
            &[9],
        ),
        labelled(
            "_AGEG5YR",
            "Fourteen-level age category",
            &[
                (1, "18-24"),
                (2, "25-29"),
                (3, "30-34"),
                (4, "35-39"),
                (5, "40-44"),
                (6, "45-49"),
                (7, "50-54"),
                (8, "55-59"),
                (9, "60-64"),
                (10, "65-69"),
                (11, "70-74"),
                (12, "75-79"),
                (13, "80+"),
            ],
            &[14],
        ),
        // Sole variant with a blank-means-unknown policy.
        yes_no("HAVARTH3", "Ever told you have arthritis").blank_as(Marker::Unknown),
        grouped(
            "PREDIAB1",
            "Ever told you have pre-diabetes or borderline diabetes",
            &[(vec![1, 2], "Yes"), (vec![3], "No")],
            DK_REFUSED_1,
        ),
        grouped(
            "TRNSGNDR",
            "Considers self to be transgender",
            &[(vec![1, 2, 3], "Yes"), (vec![4], "No")],
            DK_REFUSED_1,
        ),
        labelled(
            "_RFHYPE5",
            "Told high blood pressure",
            &[(1, "No"), (2, "Yes")],
            &[],
        ),
    ]
}

fn composite_fields() -> Vec<FieldRule> {
    let mut rules = Vec::new();

    for (name, description) in [
        ("BLDSUGAR", "Times per month checking blood for glucose"),
        ("FEETCHK2", "Times per month checking feet for sores"),
    ] {
        rules.push(
            composite(name, description, per_month_with_year())
                .sentinel(&[888], Marker::Zero)
                .sentinel(DK_REFUSED_3, Marker::Unknown),
        );
    }

    for (name, description) in [
        ("EXEROFT1", "Times per month doing the first activity"),
        ("EXEROFT2", "Times per month doing the second activity"),
    ] {
        rules.push(composite(name, description, week_or_month()).sentinel(DK_REFUSED_3, Marker::Unknown));
    }

    for (name, description) in [
        ("EXERHMM1", "Minutes per session of the first activity"),
        ("EXERHMM2", "Minutes per session of the second activity"),
    ] {
        rules.push(
            composite(name, description, hours_minutes())
                .sentinel(&[888], Marker::Zero)
                .sentinel(DK_REFUSED_3, Marker::Unknown),
        );
    }

    for (name, description) in [
        ("ALCDAY5", "Days per month with at least one drink"),
        ("STRENGTH", "Times per month doing muscle strengthening"),
    ] {
        rules.push(
            composite(name, description, week_or_month())
                .sentinel(&[888], Marker::Zero)
                .sentinel(DK_REFUSED_3, Marker::Unknown),
        );
    }

    for (name, description) in [
        ("FRUITJU1", "Times per month drinking 100% fruit juice"),
        ("FRUIT1", "Times per month eating fruit"),
        ("FVBEANS", "Times per month eating beans or lentils"),
        ("FVGREEN", "Times per month eating dark green vegetables"),
        ("FVORANG", "Times per month eating orange vegetables"),
        ("VEGETAB1", "Times per month eating other vegetables"),
    ] {
        rules.push(
            composite(name, description, per_month())
                .sentinel(&[300, 555], Marker::Zero)
                .sentinel(DK_REFUSED_3, Marker::Unknown),
        );
    }

    rules
}

fn bounded_fields() -> Vec<FieldRule> {
    let mut rules = Vec::new();

    for (name, description) in [
        ("PHYSHLTH", "Days in the past 30 physical health was not good"),
        ("MENTHLTH", "Days in the past 30 mental health was not good"),
        ("POORHLTH", "Days in the past 30 poor health kept you from usual activities"),
    ] {
        rules.push(
            bounded(name, description, Some(1.0), Some(30.0))
                .sentinel(&[88], Marker::Zero)
                .sentinel(DK_REFUSED_2, Marker::Unknown),
        );
    }

    rules.push(
        bounded("JOINPAIN", "Joint pain in the past 30 days on a 0-10 scale", Some(0.0), Some(10.0))
            .sentinel(DK_REFUSED_2, Marker::Unknown),
    );
    rules.push(
        bounded("HIVTSTD3", "Month and year of last HIV test", Some(11985.0), Some(122016.0))
            .sentinel(&[777777, 999999], Marker::Unknown),
    );

    for (name, description) in [
        ("DOCTDIAB", "Times seen a health professional for diabetes in the past 12 months"),
        ("FEETCHK", "Times feet were checked by a health professional in the past 12 months"),
        ("DRNK3GE5", "Binge drinking occasions in the past 30 days"),
        ("MAXDRNKS", "Largest number of drinks on one occasion"),
        ("AVEDRNK2", "Average drinks per drinking day"),
    ] {
        rules.push(
            bounded(name, description, Some(1.0), Some(76.0))
                .sentinel(&[88], Marker::Zero)
                .sentinel(DK_REFUSED_2, Marker::Unknown),
        );
    }

    rules.push(
        bounded("CHKHEMO3", "A1C checks in the past 12 months", Some(1.0), Some(76.0))
            .sentinel(&[88], Marker::Zero)
            .sentinel(&[77, 98, 99], Marker::Unknown),
    );
    rules.push(
        bounded("FC60_", "Estimated functional capacity", Some(0.0), Some(8590.0))
            .sentinel(&[99900], Marker::Unknown),
    );

    for (name, description) in [
        ("EXRACT11", "Type of first physical activity"),
        ("EXRACT21", "Type of second physical activity"),
    ] {
        rules.push(
            bounded(name, description, None, None)
                .sentinel(&[88], Marker::Zero)
                .sentinel(&[77, 98, 99], Marker::Unknown),
        );
    }

    rules.push(
        bounded("_DRNKWEK", "Computed drinks per week", Some(0.0), Some(98999.0))
            .sentinel(&[99900], Marker::Unknown),
    );

    for (name, description) in [
        ("FTJUDA1_", "Fruit juice intake per day"),
        ("FRUTDA1_", "Fruit intake per day"),
        ("BEANDAY_", "Bean intake per day"),
        ("GRENDAY_", "Dark green vegetable intake per day"),
        ("ORNGDAY_", "Orange vegetable intake per day"),
        ("VEGEDA1_", "Other vegetable intake per day"),
    ] {
        rules.push(bounded(name, description, Some(0.0), Some(9999.0)));
    }

    for (name, description) in [
        ("PAFREQ1_", "Weekly frequency of first activity"),
        ("PAFREQ2_", "Weekly frequency of second activity"),
        ("STRFREQ_", "Weekly strength activity frequency"),
    ] {
        rules.push(
            bounded(name, description, Some(0.0), Some(98999.0))
                .sentinel(&[99000], Marker::Unknown),
        );
    }

    rules.push(
        bounded("WTKG3", "Computed weight in kilograms", Some(2300.0), Some(29500.0))
            .sentinel(&[99999], Marker::Unknown),
    );
    rules.push(bounded("DROCDY3_", "Drink-occasions per day", None, None).sentinel(&[900], Marker::Unknown));

    rules
}

/// Every rule of the standard table, outcomes first.
pub fn standard_rules() -> Vec<FieldRule> {
    let mut rules = outcomes();
    rules.extend(YES_NO.iter().map(|&(name, description)| yes_no(name, description)));
    rules.extend(
        REVERSED_YES_NO
            .iter()
            .map(|&(name, description)| reversed_yes_no(name, description)),
    );
    rules.extend(categorical_fields());
    rules.extend(composite_fields());
    rules.extend(bounded_fields());
    rules.extend(
        PASSTHROUGH
            .iter()
            .map(|&(name, description)| passthrough(name, description)),
    );
    rules
}

/// The standard registry. Validity is covered by tests.
pub(crate) fn standard_registry() -> FieldRegistry {
    FieldRegistry::assemble(STANDARD_VERSION, standard_rules())
}
