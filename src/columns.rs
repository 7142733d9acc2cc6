use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    DateTime,
    Date,
    Time,
    Temperature,
    WindSpeed,
    WindDirection,
    SnowDepth,
    NewSnow24h,
    Swe,
    Precipitation,
}

#[derive(Debug, Clone)]
pub struct ColumnRule {
    pub field: Field,
    pub all_of: &'static [&'static str],
    pub none_of: &'static [&'static str],
}

impl ColumnRule {
    pub const fn new(
        field: Field,
        all_of: &'static [&'static str],
        none_of: &'static [&'static str],
    ) -> Self {
        Self {
            field,
            all_of,
            none_of,
        }
    }

    pub fn matches(&self, normalized_header: &str) -> bool {
        self.all_of.iter().all(|s| normalized_header.contains(s))
            && !self.none_of.iter().any(|s| normalized_header.contains(s))
    }
}

const DEFAULT_RULES: &[ColumnRule] = &[
    ColumnRule::new(Field::DateTime, &["date", "time"], &[]),
    ColumnRule::new(Field::Date, &["date"], &[]),
    ColumnRule::new(Field::Time, &["time"], &[]),
    ColumnRule::new(Field::Temperature, &["temp"], &["dew"]),
    ColumnRule::new(Field::WindSpeed, &["wind", "speed"], &[]),
    ColumnRule::new(Field::WindDirection, &["wind", "direction"], &[]),
    ColumnRule::new(Field::SnowDepth, &["snow", "depth"], &[]),
    ColumnRule::new(Field::NewSnow24h, &["snowfall", "24"], &[]),
    ColumnRule::new(Field::Swe, &["equivalent"], &[]),
    ColumnRule::new(Field::Precipitation, &["precip"], &["snow"]),
];

#[derive(Debug, Clone)]
pub struct ColumnRules {
    rules: Vec<ColumnRule>,
}

impl Default for ColumnRules {
    fn default() -> Self {
        Self {
            rules: DEFAULT_RULES.to_vec(),
        }
    }
}

impl ColumnRules {
    /// Rule table for the older page layout, where precipitation was taken from
    /// either a "precip" or an "equivalent" column.
    pub fn simplified() -> Self {
        let mut rules: Vec<ColumnRule> = DEFAULT_RULES
            .iter()
            .filter(|r| r.field != Field::Precipitation)
            .cloned()
            .collect();
        rules.push(ColumnRule::new(Field::Precipitation, &["precip"], &[]));
        rules.push(ColumnRule::new(Field::Precipitation, &["equivalent"], &[]));
        Self { rules }
    }

    pub fn push(&mut self, rule: ColumnRule) {
        self.rules.push(rule);
    }

    pub fn resolve<S: AsRef<str>>(&self, headers: &[S]) -> ColumnMap {
        let normalized: Vec<String> = headers
            .iter()
            .map(|h| normalize_header(h.as_ref()))
            .collect();

        let mut map = ColumnMap::default();
        for rule in &self.rules {
            if map.get(rule.field).is_some() {
                continue;
            }
            if let Some(index) = normalized.iter().position(|h| rule.matches(h)) {
                map.set(rule.field, index);
            }
        }

        // A combined date-time column is the only date source.
        if let Some(index) = map.date_time {
            map.date = Some(index);
            map.time = None;
            map.combined_date_time = true;
        }
        map.date_time = None;
        map
    }
}

pub fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMap {
    pub date: Option<usize>,
    pub time: Option<usize>,
    pub combined_date_time: bool,
    pub temperature: Option<usize>,
    pub wind_speed: Option<usize>,
    pub wind_direction: Option<usize>,
    pub snow_depth: Option<usize>,
    pub new_snow_24h: Option<usize>,
    pub swe: Option<usize>,
    pub precipitation: Option<usize>,
    #[serde(skip)]
    date_time: Option<usize>,
}

impl ColumnMap {
    pub fn resolve<S: AsRef<str>>(headers: &[S]) -> Self {
        ColumnRules::default().resolve(headers)
    }

    pub fn has_date_source(&self) -> bool {
        self.date.is_some()
    }

    pub fn get(&self, field: Field) -> Option<usize> {
        match field {
            Field::DateTime => self.date_time,
            Field::Date => self.date,
            Field::Time => self.time,
            Field::Temperature => self.temperature,
            Field::WindSpeed => self.wind_speed,
            Field::WindDirection => self.wind_direction,
            Field::SnowDepth => self.snow_depth,
            Field::NewSnow24h => self.new_snow_24h,
            Field::Swe => self.swe,
            Field::Precipitation => self.precipitation,
        }
    }

    fn set(&mut self, field: Field, index: usize) {
        let slot = match field {
            Field::DateTime => &mut self.date_time,
            Field::Date => &mut self.date,
            Field::Time => &mut self.time,
            Field::Temperature => &mut self.temperature,
            Field::WindSpeed => &mut self.wind_speed,
            Field::WindDirection => &mut self.wind_direction,
            Field::SnowDepth => &mut self.snow_depth,
            Field::NewSnow24h => &mut self.new_snow_24h,
            Field::Swe => &mut self.swe,
            Field::Precipitation => &mut self.precipitation,
        };
        *slot = Some(index);
    }
}
