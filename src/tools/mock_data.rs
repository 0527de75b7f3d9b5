//! 模拟数据：地点与酒店
//!
//! 内置 Paris、Tokyo、Bangalore 三个城市；其它城市按名称确定性地生成一组地点与酒店，
//! 同一城市名每次得到相同的数据（坐标、评分、价格都由稳定哈希导出）。

use crate::models::GeoPoint;

pub struct PlaceSeed {
    pub id: &'static str,
    pub name: &'static str,
    pub types: &'static [&'static str],
    pub address: &'static str,
    pub lat: f64,
    pub lng: f64,
    pub rating: f64,
    pub ratings_total: u32,
    pub price_level: Option<u8>,
    pub cost: Option<f64>,
    pub description: &'static str,
    pub hours: &'static str,
}

pub struct RoomSeed {
    pub id: &'static str,
    pub name: &'static str,
    pub capacity: u32,
    pub price: f64,
}

pub struct HotelSeed {
    pub id: &'static str,
    pub name: &'static str,
    pub address: &'static str,
    pub lat: f64,
    pub lng: f64,
    pub rating: f64,
    pub review_count: u32,
    pub currency: &'static str,
    pub amenities: &'static [&'static str],
    pub free_cancellation: bool,
    pub rooms: &'static [RoomSeed],
}

pub struct CitySeed {
    pub key: &'static str,
    pub name: &'static str,
    pub country: &'static str,
    pub places: &'static [PlaceSeed],
    pub hotels: &'static [HotelSeed],
}

const PARIS_PLACES: &[PlaceSeed] = &[
    PlaceSeed {
        id: "paris_eiffel_tower",
        name: "Eiffel Tower",
        types: &["tourist_attraction", "landmark"],
        address: "Champ de Mars, 5 Av. Anatole France, 75007 Paris",
        lat: 48.8584,
        lng: 2.2945,
        rating: 4.7,
        ratings_total: 412_000,
        price_level: Some(2),
        cost: Some(29.0),
        description: "Wrought-iron lattice tower and the most famous landmark in Paris",
        hours: "09:30-23:45",
    },
    PlaceSeed {
        id: "paris_louvre",
        name: "Louvre Museum",
        types: &["museum", "tourist_attraction"],
        address: "Rue de Rivoli, 75001 Paris",
        lat: 48.8606,
        lng: 2.3376,
        rating: 4.7,
        ratings_total: 298_000,
        price_level: Some(2),
        cost: Some(22.0),
        description: "World's largest art museum, home of the Mona Lisa",
        hours: "09:00-18:00",
    },
    PlaceSeed {
        id: "paris_orsay",
        name: "Musée d'Orsay",
        types: &["museum", "art_gallery"],
        address: "1 Rue de la Légion d'Honneur, 75007 Paris",
        lat: 48.8600,
        lng: 2.3266,
        rating: 4.8,
        ratings_total: 96_000,
        price_level: Some(2),
        cost: Some(16.0),
        description: "Impressionist masterpieces in a former railway station",
        hours: "09:30-18:00",
    },
    PlaceSeed {
        id: "paris_notre_dame",
        name: "Notre-Dame Cathedral",
        types: &["church", "tourist_attraction"],
        address: "6 Parvis Notre-Dame, 75004 Paris",
        lat: 48.8530,
        lng: 2.3499,
        rating: 4.7,
        ratings_total: 151_000,
        price_level: None,
        cost: None,
        description: "Gothic cathedral on the Île de la Cité",
        hours: "07:45-19:00",
    },
    PlaceSeed {
        id: "paris_sacre_coeur",
        name: "Sacré-Cœur Basilica",
        types: &["church", "tourist_attraction"],
        address: "35 Rue du Chevalier de la Barre, 75018 Paris",
        lat: 48.8867,
        lng: 2.3431,
        rating: 4.7,
        ratings_total: 120_000,
        price_level: None,
        cost: None,
        description: "Hilltop basilica with panoramic views over Montmartre",
        hours: "06:00-22:30",
    },
    PlaceSeed {
        id: "paris_luxembourg",
        name: "Jardin du Luxembourg",
        types: &["park", "tourist_attraction"],
        address: "75006 Paris",
        lat: 48.8462,
        lng: 2.3372,
        rating: 4.7,
        ratings_total: 88_000,
        price_level: None,
        cost: None,
        description: "Formal gardens, fountains and the Luxembourg Palace",
        hours: "07:30-20:30",
    },
    PlaceSeed {
        id: "paris_cafe_de_flore",
        name: "Café de Flore",
        types: &["cafe", "restaurant"],
        address: "172 Bd Saint-Germain, 75006 Paris",
        lat: 48.8541,
        lng: 2.3326,
        rating: 4.2,
        ratings_total: 15_000,
        price_level: Some(3),
        cost: Some(30.0),
        description: "Historic literary café in Saint-Germain-des-Prés",
        hours: "07:30-01:30",
    },
    PlaceSeed {
        id: "paris_galeries_lafayette",
        name: "Galeries Lafayette Haussmann",
        types: &["department_store", "shopping_mall"],
        address: "40 Bd Haussmann, 75009 Paris",
        lat: 48.8738,
        lng: 2.3320,
        rating: 4.5,
        ratings_total: 54_000,
        price_level: Some(3),
        cost: None,
        description: "Art nouveau department store with a rooftop terrace",
        hours: "10:00-20:30",
    },
];

const PARIS_HOTELS: &[HotelSeed] = &[
    HotelSeed {
        id: "paris_le_meurice",
        name: "Hôtel Le Meurice",
        address: "228 Rue de Rivoli, 75001 Paris",
        lat: 48.8651,
        lng: 2.3281,
        rating: 4.8,
        review_count: 2_300,
        currency: "EUR",
        amenities: &["wifi", "spa", "restaurant", "room_service", "concierge"],
        free_cancellation: true,
        rooms: &[
            RoomSeed {
                id: "superior",
                name: "Superior Room",
                capacity: 2,
                price: 1250.0,
            },
            RoomSeed {
                id: "suite",
                name: "Junior Suite",
                capacity: 3,
                price: 2400.0,
            },
        ],
    },
    HotelSeed {
        id: "paris_regina_louvre",
        name: "Hotel Regina Louvre",
        address: "2 Pl. des Pyramides, 75001 Paris",
        lat: 48.8637,
        lng: 2.3321,
        rating: 4.6,
        review_count: 1_800,
        currency: "EUR",
        amenities: &["wifi", "restaurant", "bar", "room_service"],
        free_cancellation: true,
        rooms: &[
            RoomSeed {
                id: "classic",
                name: "Classic Room",
                capacity: 2,
                price: 420.0,
            },
            RoomSeed {
                id: "family",
                name: "Family Room",
                capacity: 4,
                price: 690.0,
            },
        ],
    },
    HotelSeed {
        id: "paris_pullman_eiffel",
        name: "Pullman Paris Tour Eiffel",
        address: "18 Av. de Suffren, 75015 Paris",
        lat: 48.8554,
        lng: 2.2928,
        rating: 4.4,
        review_count: 6_100,
        currency: "EUR",
        amenities: &["wifi", "gym", "restaurant", "bar"],
        free_cancellation: false,
        rooms: &[RoomSeed {
            id: "deluxe",
            name: "Deluxe Room",
            capacity: 2,
            price: 290.0,
        }],
    },
    HotelSeed {
        id: "paris_generator",
        name: "Generator Paris",
        address: "9-11 Pl. du Colonel Fabien, 75010 Paris",
        lat: 48.8776,
        lng: 2.3705,
        rating: 4.1,
        review_count: 9_400,
        currency: "EUR",
        amenities: &["wifi", "bar"],
        free_cancellation: true,
        rooms: &[
            RoomSeed {
                id: "dorm",
                name: "Shared Dorm Bed",
                capacity: 1,
                price: 38.0,
            },
            RoomSeed {
                id: "private",
                name: "Private Twin",
                capacity: 2,
                price: 115.0,
            },
        ],
    },
];

const TOKYO_PLACES: &[PlaceSeed] = &[
    PlaceSeed {
        id: "tokyo_sensoji",
        name: "Sensō-ji",
        types: &["place_of_worship", "tourist_attraction"],
        address: "2-3-1 Asakusa, Taito City, Tokyo",
        lat: 35.7148,
        lng: 139.7967,
        rating: 4.5,
        ratings_total: 74_000,
        price_level: None,
        cost: None,
        description: "Tokyo's oldest temple with the Kaminarimon gate",
        hours: "06:00-17:00",
    },
    PlaceSeed {
        id: "tokyo_meiji_jingu",
        name: "Meiji Jingu",
        types: &["place_of_worship", "park"],
        address: "1-1 Yoyogikamizonocho, Shibuya City, Tokyo",
        lat: 35.6764,
        lng: 139.6993,
        rating: 4.6,
        ratings_total: 51_000,
        price_level: None,
        cost: None,
        description: "Shinto shrine set in a large forested park",
        hours: "05:00-18:00",
    },
    PlaceSeed {
        id: "tokyo_skytree",
        name: "Tokyo Skytree",
        types: &["tourist_attraction", "landmark"],
        address: "1-1-2 Oshiage, Sumida City, Tokyo",
        lat: 35.7101,
        lng: 139.8107,
        rating: 4.5,
        ratings_total: 88_000,
        price_level: Some(2),
        cost: Some(21.0),
        description: "Broadcasting tower with observation decks at 350 m and 450 m",
        hours: "10:00-21:00",
    },
    PlaceSeed {
        id: "tokyo_tsukiji",
        name: "Tsukiji Outer Market",
        types: &["market", "food"],
        address: "4 Chome-16-2 Tsukiji, Chuo City, Tokyo",
        lat: 35.6655,
        lng: 139.7707,
        rating: 4.3,
        ratings_total: 40_000,
        price_level: Some(2),
        cost: Some(25.0),
        description: "Street food stalls and seafood shops",
        hours: "05:00-14:00",
    },
    PlaceSeed {
        id: "tokyo_shinjuku_gyoen",
        name: "Shinjuku Gyoen",
        types: &["park"],
        address: "11 Naitomachi, Shinjuku City, Tokyo",
        lat: 35.6852,
        lng: 139.7101,
        rating: 4.7,
        ratings_total: 45_000,
        price_level: Some(1),
        cost: Some(4.0),
        description: "Landscaped gardens famous for cherry blossoms",
        hours: "09:00-18:00",
    },
    PlaceSeed {
        id: "tokyo_teamlab",
        name: "teamLab Planets",
        types: &["museum", "art_gallery"],
        address: "6-1-16 Toyosu, Koto City, Tokyo",
        lat: 35.6491,
        lng: 139.7898,
        rating: 4.6,
        ratings_total: 30_000,
        price_level: Some(3),
        cost: Some(26.0),
        description: "Immersive digital art museum",
        hours: "09:00-22:00",
    },
];

const TOKYO_HOTELS: &[HotelSeed] = &[
    HotelSeed {
        id: "tokyo_park_hyatt",
        name: "Park Hyatt Tokyo",
        address: "3-7-1-2 Nishishinjuku, Shinjuku City, Tokyo",
        lat: 35.6856,
        lng: 139.6907,
        rating: 4.7,
        review_count: 3_900,
        currency: "JPY",
        amenities: &["wifi", "pool", "spa", "gym", "restaurant"],
        free_cancellation: true,
        rooms: &[RoomSeed {
            id: "park_king",
            name: "Park King Room",
            capacity: 2,
            price: 98_000.0,
        }],
    },
    HotelSeed {
        id: "tokyo_gracery",
        name: "Hotel Gracery Shinjuku",
        address: "1-19-1 Kabukicho, Shinjuku City, Tokyo",
        lat: 35.6951,
        lng: 139.7020,
        rating: 4.3,
        review_count: 12_000,
        currency: "JPY",
        amenities: &["wifi", "restaurant"],
        free_cancellation: true,
        rooms: &[
            RoomSeed {
                id: "standard_double",
                name: "Standard Double",
                capacity: 2,
                price: 21_000.0,
            },
            RoomSeed {
                id: "triple",
                name: "Triple Room",
                capacity: 3,
                price: 32_000.0,
            },
        ],
    },
];

const BANGALORE_PLACES: &[PlaceSeed] = &[
    PlaceSeed {
        id: "place_1",
        name: "Bangalore Palace",
        types: &["tourist_attraction", "museum"],
        address: "Vasanth Nagar, Bengaluru, Karnataka",
        lat: 12.9980,
        lng: 77.5920,
        rating: 4.2,
        ratings_total: 48_000,
        price_level: Some(1),
        cost: Some(6.0),
        description: "Tudor-style palace built in 1887",
        hours: "10:00-17:30",
    },
    PlaceSeed {
        id: "bangalore_lalbagh",
        name: "Lalbagh Botanical Garden",
        types: &["park", "tourist_attraction"],
        address: "Mavalli, Bengaluru, Karnataka",
        lat: 12.9507,
        lng: 77.5848,
        rating: 4.4,
        ratings_total: 110_000,
        price_level: Some(1),
        cost: Some(1.0),
        description: "Botanical garden with a glasshouse modelled on Crystal Palace",
        hours: "06:00-19:00",
    },
    PlaceSeed {
        id: "bangalore_cubbon_park",
        name: "Cubbon Park",
        types: &["park"],
        address: "Kasturba Road, Bengaluru, Karnataka",
        lat: 12.9763,
        lng: 77.5929,
        rating: 4.5,
        ratings_total: 95_000,
        price_level: None,
        cost: None,
        description: "Green lung of the city, popular for morning walks",
        hours: "06:00-18:00",
    },
    PlaceSeed {
        id: "bangalore_mtr",
        name: "Mavalli Tiffin Rooms",
        types: &["restaurant"],
        address: "Lalbagh Road, Bengaluru, Karnataka",
        lat: 12.9551,
        lng: 77.5857,
        rating: 4.4,
        ratings_total: 31_000,
        price_level: Some(1),
        cost: Some(4.0),
        description: "Classic South Indian breakfast institution since 1924",
        hours: "06:30-21:00",
    },
    PlaceSeed {
        id: "bangalore_commercial_street",
        name: "Commercial Street",
        types: &["market", "store"],
        address: "Tasker Town, Shivajinagar, Bengaluru, Karnataka",
        lat: 12.9822,
        lng: 77.6083,
        rating: 4.2,
        ratings_total: 60_000,
        price_level: Some(2),
        cost: None,
        description: "Busy shopping street for clothes and jewellery",
        hours: "10:00-21:00",
    },
];

const BANGALORE_HOTELS: &[HotelSeed] = &[
    HotelSeed {
        id: "hotel_1",
        name: "Taj West End",
        address: "25, Race Course Road, Bengaluru",
        lat: 12.9850,
        lng: 77.5845,
        rating: 4.7,
        review_count: 8_200,
        currency: "INR",
        amenities: &["wifi", "pool", "spa", "restaurant", "gym"],
        free_cancellation: true,
        rooms: &[RoomSeed {
            id: "deluxe",
            name: "Deluxe Room",
            capacity: 2,
            price: 18_000.0,
        }],
    },
    HotelSeed {
        id: "hotel_2",
        name: "ITC Gardenia",
        address: "1, Residency Road, Bengaluru",
        lat: 12.9667,
        lng: 77.5996,
        rating: 4.6,
        review_count: 9_700,
        currency: "INR",
        amenities: &["wifi", "pool", "spa", "restaurant"],
        free_cancellation: true,
        rooms: &[RoomSeed {
            id: "executive",
            name: "Executive Club",
            capacity: 2,
            price: 16_500.0,
        }],
    },
    HotelSeed {
        id: "hotel_3",
        name: "The Oberoi",
        address: "37-39, MG Road, Bengaluru",
        lat: 12.9733,
        lng: 77.6190,
        rating: 4.8,
        review_count: 5_400,
        currency: "INR",
        amenities: &["wifi", "pool", "spa", "restaurant", "gym"],
        free_cancellation: false,
        rooms: &[RoomSeed {
            id: "premier",
            name: "Premier Room",
            capacity: 2,
            price: 21_000.0,
        }],
    },
];

pub const CITIES: &[CitySeed] = &[
    CitySeed {
        key: "paris",
        name: "Paris",
        country: "France",
        places: PARIS_PLACES,
        hotels: PARIS_HOTELS,
    },
    CitySeed {
        key: "tokyo",
        name: "Tokyo",
        country: "Japan",
        places: TOKYO_PLACES,
        hotels: TOKYO_HOTELS,
    },
    CitySeed {
        key: "bangalore",
        name: "Bangalore",
        country: "India",
        places: BANGALORE_PLACES,
        hotels: BANGALORE_HOTELS,
    },
];

/// 运行时地点
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub id: String,
    pub name: String,
    pub types: Vec<String>,
    pub address: String,
    pub location: GeoPoint,
    pub rating: f64,
    pub ratings_total: u32,
    pub price_level: Option<u8>,
    pub cost: Option<f64>,
    pub description: String,
    pub opening_hours: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Room {
    pub id: String,
    pub name: String,
    pub capacity: u32,
    pub price: f64,
}

/// 运行时酒店
#[derive(Debug, Clone, PartialEq)]
pub struct Hotel {
    pub id: String,
    pub name: String,
    pub city: String,
    pub address: String,
    pub location: GeoPoint,
    pub rating: f64,
    pub review_count: u32,
    pub currency: String,
    pub amenities: Vec<String>,
    pub free_cancellation: bool,
    pub rooms: Vec<Room>,
}

impl Hotel {
    /// 容纳 guests 人（rooms 间）的最低房价；没有合适房型时取全部房型最低价
    pub fn cheapest_rate(&self, guests: u32, rooms: u32) -> Option<&Room> {
        let rooms = rooms.max(1);
        let fitting = self
            .rooms
            .iter()
            .filter(|r| r.capacity * rooms >= guests)
            .min_by(|a, b| a.price.total_cmp(&b.price));
        fitting.or_else(|| self.rooms.iter().min_by(|a, b| a.price.total_cmp(&b.price)))
    }
}

impl From<&PlaceSeed> for Place {
    fn from(seed: &PlaceSeed) -> Self {
        Self {
            id: seed.id.to_string(),
            name: seed.name.to_string(),
            types: seed.types.iter().map(|t| t.to_string()).collect(),
            address: seed.address.to_string(),
            location: GeoPoint {
                lat: seed.lat,
                lng: seed.lng,
            },
            rating: seed.rating,
            ratings_total: seed.ratings_total,
            price_level: seed.price_level,
            cost: seed.cost,
            description: seed.description.to_string(),
            opening_hours: vec![seed.hours.to_string()],
        }
    }
}

fn hotel_from_seed(seed: &HotelSeed, city: &str) -> Hotel {
    Hotel {
        id: seed.id.to_string(),
        name: seed.name.to_string(),
        city: city.to_string(),
        address: seed.address.to_string(),
        location: GeoPoint {
            lat: seed.lat,
            lng: seed.lng,
        },
        rating: seed.rating,
        review_count: seed.review_count,
        currency: seed.currency.to_string(),
        amenities: seed.amenities.iter().map(|a| a.to_string()).collect(),
        free_cancellation: seed.free_cancellation,
        rooms: seed
            .rooms
            .iter()
            .map(|r| Room {
                id: r.id.to_string(),
                name: r.name.to_string(),
                capacity: r.capacity,
                price: r.price,
            })
            .collect(),
    }
}

/// FNV-1a，跨进程稳定
pub fn stable_hash(s: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in s.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}

/// 按名称匹配内置城市（"Paris, France" 也能匹配 paris）
pub fn find_city(location: &str) -> Option<&'static CitySeed> {
    let lowered = location.to_lowercase();
    CITIES.iter().find(|c| lowered.contains(c.key))
}

fn city_slug(location: &str) -> String {
    let base = location.split(',').next().unwrap_or(location).trim().to_lowercase();
    let slug: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    let slug = slug.trim_matches('-').to_string();
    if slug.is_empty() {
        "somewhere".to_string()
    } else {
        slug
    }
}

fn city_name_from_slug(slug: &str) -> String {
    slug.split('-')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn generated_center(slug: &str) -> GeoPoint {
    let h = stable_hash(slug);
    GeoPoint {
        lat: ((h % 10_000) as f64 / 10_000.0) * 100.0 - 50.0,
        lng: (((h >> 16) % 10_000) as f64 / 10_000.0) * 300.0 - 150.0,
    }
}

/// (名称模板, types, 评分, 费用, 描述)
const GENERATED_PLACES: &[(&str, &[&str], f64, Option<f64>, &str)] = &[
    ("{} Old Town", &["tourist_attraction", "landmark"], 4.6, None, "Historic centre with narrow streets and old squares"),
    ("{} History Museum", &["museum"], 4.5, Some(12.0), "Collections covering the city's history"),
    ("{} Central Park", &["park"], 4.4, None, "Large public park for walks and picnics"),
    ("{} Central Market", &["market", "food"], 4.3, Some(15.0), "Covered market with local produce and street food"),
    ("{} Cathedral", &["church", "tourist_attraction"], 4.5, None, "The city's principal place of worship"),
    ("Bistro {}", &["restaurant"], 4.2, Some(25.0), "Well-reviewed restaurant serving regional dishes"),
];

fn generated_places(slug: &str) -> Vec<Place> {
    let city = city_name_from_slug(slug);
    let center = generated_center(slug);
    GENERATED_PLACES
        .iter()
        .enumerate()
        .map(|(i, (template, types, rating, cost, description))| {
            let offset = i as f64 * 0.006;
            Place {
                id: format!("gen_{slug}_{i}"),
                name: template.replace("{}", &city),
                types: types.iter().map(|t| t.to_string()).collect(),
                address: format!("{city} city centre"),
                location: GeoPoint {
                    lat: center.lat + offset,
                    lng: center.lng - offset * 0.7,
                },
                rating: *rating,
                ratings_total: 1_000 + (stable_hash(&format!("{slug}{i}")) % 9_000) as u32,
                price_level: cost.map(|_| 2),
                cost: *cost,
                description: description.to_string(),
                opening_hours: vec!["09:00-18:00".to_string()],
            }
        })
        .collect()
}

fn generated_hotels(slug: &str) -> Vec<Hotel> {
    let city = city_name_from_slug(slug);
    let center = generated_center(slug);
    let specs: [(&str, f64, f64, &[&str], bool); 3] = [
        ("{} Grand Hotel", 4.5, 210.0, &["wifi", "spa", "restaurant", "gym"], true),
        ("{} City Inn", 4.1, 95.0, &["wifi", "restaurant"], true),
        ("{} Backpackers", 3.8, 35.0, &["wifi"], false),
    ];
    specs
        .iter()
        .enumerate()
        .map(|(i, (template, rating, price, amenities, free_cancellation))| Hotel {
            id: format!("gen_{slug}_h{i}"),
            name: template.replace("{}", &city),
            city: city.clone(),
            address: format!("{} Main Street, {city}", 10 + i * 7),
            location: GeoPoint {
                lat: center.lat - 0.003 * (i as f64 + 1.0),
                lng: center.lng + 0.002 * (i as f64 + 1.0),
            },
            rating: *rating,
            review_count: 500 + (stable_hash(&format!("{slug}h{i}")) % 4_000) as u32,
            currency: "USD".to_string(),
            amenities: amenities.iter().map(|a| a.to_string()).collect(),
            free_cancellation: *free_cancellation,
            rooms: vec![
                Room {
                    id: "standard".to_string(),
                    name: "Standard Room".to_string(),
                    capacity: 2,
                    price: *price,
                },
                Room {
                    id: "family".to_string(),
                    name: "Family Room".to_string(),
                    capacity: 4,
                    price: (price * 1.6).round(),
                },
            ],
        })
        .collect()
}

/// 城市的全部地点
pub fn places_for(location: &str) -> Vec<Place> {
    match find_city(location) {
        Some(city) => city.places.iter().map(Place::from).collect(),
        None => generated_places(&city_slug(location)),
    }
}

/// 城市的全部酒店
pub fn hotels_for(location: &str) -> Vec<Hotel> {
    match find_city(location) {
        Some(city) => city
            .hotels
            .iter()
            .map(|h| hotel_from_seed(h, city.name))
            .collect(),
        None => generated_hotels(&city_slug(location)),
    }
}

/// 解析生成 ID 中的城市 slug：gen_{slug}_{n} / gen_{slug}_h{n}
fn generated_slug(id: &str) -> Option<&str> {
    let rest = id.strip_prefix("gen_")?;
    let (slug, _) = rest.rsplit_once('_')?;
    Some(slug)
}

pub fn find_place(place_id: &str) -> Option<Place> {
    if let Some(slug) = generated_slug(place_id) {
        return generated_places(slug).into_iter().find(|p| p.id == place_id);
    }
    CITIES
        .iter()
        .flat_map(|c| c.places.iter())
        .find(|p| p.id == place_id)
        .map(Place::from)
}

pub fn find_hotel(hotel_id: &str) -> Option<Hotel> {
    if let Some(slug) = generated_slug(hotel_id) {
        return generated_hotels(slug).into_iter().find(|h| h.id == hotel_id);
    }
    CITIES.iter().find_map(|c| {
        c.hotels
            .iter()
            .find(|h| h.id == hotel_id)
            .map(|h| hotel_from_seed(h, c.name))
    })
}
