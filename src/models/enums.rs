use crate::db::DatabaseError;

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// Serde goes through the same string table, so the stored and the
/// wire representation never drift apart.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$(Self::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

// Order is the classifier's output order; index i of the logits is ALL[i].
str_enum!(FoodClass {
    AsianPear => "asian pear",
    Cucumber => "cucumber",
    Eggs => "eggs",
    Hand => "hand",
    LeafyGreen => "leafy green",
    Leftovers => "leftovers",
    Orange => "orange",
    Sauce => "sauce",
    Soda => "soda",
    Tomato => "tomato",
});

str_enum!(ItemStatus {
    InFridge => "in_fridge",
    Removed => "removed",
    Expired => "expired",
});

impl FoodClass {
    /// Class for a logit index, `None` outside the label set.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn food_classes_keep_model_output_order() {
        assert_eq!(FoodClass::ALL.len(), 10);
        assert_eq!(FoodClass::from_index(0), Some(FoodClass::AsianPear));
        assert_eq!(FoodClass::from_index(3), Some(FoodClass::Hand));
        assert_eq!(FoodClass::from_index(9), Some(FoodClass::Tomato));
        assert_eq!(FoodClass::from_index(10), None);
    }

    #[test]
    fn item_status_round_trips_through_str() {
        for status in ItemStatus::ALL {
            assert_eq!(status.as_str().parse::<ItemStatus>().unwrap(), *status);
        }
    }

    #[test]
    fn unknown_status_is_invalid_enum() {
        let err = "eaten".parse::<ItemStatus>().unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidEnum { ref value, .. } if value == "eaten"));
    }

    #[test]
    fn serde_uses_string_table() {
        let json = serde_json::to_string(&ItemStatus::InFridge).unwrap();
        assert_eq!(json, "\"in_fridge\"");
        let class: FoodClass = serde_json::from_str("\"leafy green\"").unwrap();
        assert_eq!(class, FoodClass::LeafyGreen);
        assert!(serde_json::from_str::<ItemStatus>("\"gone\"").is_err());
    }
}
