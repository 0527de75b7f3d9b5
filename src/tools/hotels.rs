//! 酒店工具（模拟）：搜索、详情、预订、取消、查询预订
//!
//! 预订保存在进程内的 BookingLedger 中，五个工具共享同一个 ledger。

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Local, NaiveDate};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::tools::mock_data::{self, Hotel, Room};
use crate::tools::schema::{parse_args, schema_of};
use crate::tools::{Tool, ToolCallContext};

const MAX_RESULTS: usize = 10;
const TAX_PER_ROOM: f64 = 25.0;
const FREE_CANCELLATION_DAYS: i64 = 3;

fn nights_between(check_in: NaiveDate, check_out: NaiveDate) -> Result<i64, String> {
    let nights = (check_out - check_in).num_days();
    if nights <= 0 {
        return Err("check_out must be after check_in".to_string());
    }
    Ok(nights)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub booking_id: String,
    pub confirmation_number: String,
    pub status: String,
    pub hotel_id: String,
    pub hotel_name: String,
    pub room_type_id: String,
    pub room_name: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub nights: i64,
    pub rooms: u32,
    pub guests: u32,
    pub guest_name: String,
    pub email: String,
    pub phone: String,
    pub payment_method: String,
    pub special_requests: Option<String>,
    pub room_price: f64,
    pub taxes: f64,
    pub total_price: f64,
    pub currency: String,
    pub free_cancellation_until: Option<NaiveDate>,
    pub created_at: String,
    #[serde(default)]
    pub cancellation: Option<Value>,
}

/// 进程内预订账本
#[derive(Default)]
pub struct BookingLedger {
    bookings: Mutex<HashMap<String, Booking>>,
}

impl BookingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&self, mut booking: Booking) -> Booking {
        let mut bookings = self.bookings.lock().unwrap_or_else(|e| e.into_inner());
        // 同一秒内同一酒店的重复预订追加序号
        if bookings.contains_key(&booking.booking_id) {
            let base = booking.booking_id.clone();
            let mut n = 2;
            while bookings.contains_key(&format!("{base}-{n}")) {
                n += 1;
            }
            booking.booking_id = format!("{base}-{n}");
            booking.confirmation_number = format!("CNF-{}", booking.booking_id);
        }
        bookings.insert(booking.booking_id.clone(), booking.clone());
        booking
    }

    fn get(&self, booking_id: &str) -> Option<Booking> {
        self.bookings
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(booking_id)
            .cloned()
    }

    fn cancel(&self, booking_id: &str, reason: &str, today: NaiveDate) -> Result<Booking, String> {
        let mut bookings = self.bookings.lock().unwrap_or_else(|e| e.into_inner());
        let booking = bookings
            .get_mut(booking_id)
            .ok_or_else(|| format!("Booking not found: {booking_id}"))?;
        if booking.status == "cancelled" {
            return Err(format!("Booking already cancelled: {booking_id}"));
        }
        let refundable = booking
            .free_cancellation_until
            .map(|until| today <= until)
            .unwrap_or(false);
        let refund = if refundable { booking.total_price } else { 0.0 };
        booking.status = "cancelled".to_string();
        booking.cancellation = Some(json!({
            "reason": reason,
            "cancelled_on": today,
            "refund_amount": refund,
            "currency": booking.currency,
        }));
        Ok(booking.clone())
    }

    pub fn len(&self) -> usize {
        self.bookings.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn hotel_summary(hotel: &Hotel, room: Option<&Room>, nights: i64, rooms: u32) -> Value {
    let price = room.map(|r| r.price).unwrap_or(0.0);
    json!({
        "id": hotel.id,
        "name": hotel.name,
        "address": hotel.address,
        "rating": hotel.rating,
        "review_count": hotel.review_count,
        "price_per_night": price,
        "currency": hotel.currency,
        "amenities": hotel.amenities,
        "location": { "lat": hotel.location.lat, "lng": hotel.location.lng },
        "free_cancellation": hotel.free_cancellation,
        "room_type_id": room.map(|r| r.id.clone()),
        "nights": nights,
        "total_price": round2(price * f64::from(rooms.max(1)) * nights as f64),
    })
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct HotelSearchArgs {
    pub location: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    #[serde(default)]
    pub guests: Option<u32>,
    #[serde(default)]
    pub rooms: Option<u32>,
    #[serde(default)]
    pub min_rating: Option<f64>,
    #[serde(default)]
    pub price_min: Option<f64>,
    #[serde(default)]
    pub price_max: Option<f64>,
    /// 必须全部具备的设施
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub free_cancellation: Option<bool>,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// hotels.search：过滤后按评分降序、价格升序，最多 10 条
pub struct HotelSearchTool;

#[async_trait]
impl Tool for HotelSearchTool {
    fn name(&self) -> &str {
        "hotels.search"
    }

    fn description(&self) -> &str {
        "Search hotels in a city for a date range, with optional rating, price and amenity filters."
    }

    fn parameters_schema(&self) -> Value {
        schema_of::<HotelSearchArgs>()
    }

    async fn execute(&self, args: Value, _ctx: &ToolCallContext) -> Result<Value, String> {
        let args: HotelSearchArgs = parse_args(self.name(), args)?;
        if args.location.trim().is_empty() {
            return Err("location must not be empty".to_string());
        }
        let nights = nights_between(args.check_in, args.check_out)?;
        let guests = args.guests.unwrap_or(1).max(1);
        let rooms = args.rooms.unwrap_or(1).max(1);
        let limit = args.limit.unwrap_or(MAX_RESULTS).clamp(1, MAX_RESULTS);

        let wanted: Vec<String> = args.amenities.iter().map(|a| a.to_lowercase()).collect();
        let mut matches: Vec<(Hotel, Room)> = mock_data::hotels_for(&args.location)
            .into_iter()
            .filter_map(|hotel| {
                let room = hotel.cheapest_rate(guests, rooms)?.clone();
                Some((hotel, room))
            })
            .filter(|(hotel, _)| args.min_rating.map_or(true, |min| hotel.rating >= min))
            .filter(|(_, room)| args.price_min.map_or(true, |min| room.price >= min))
            .filter(|(_, room)| args.price_max.map_or(true, |max| room.price <= max))
            .filter(|(hotel, _)| {
                wanted
                    .iter()
                    .all(|a| hotel.amenities.iter().any(|h| h.eq_ignore_ascii_case(a)))
            })
            .filter(|(hotel, _)| {
                args.free_cancellation
                    .map_or(true, |required| !required || hotel.free_cancellation)
            })
            .collect();

        matches.sort_by(|(ha, ra), (hb, rb)| {
            hb.rating
                .total_cmp(&ha.rating)
                .then(ra.price.total_cmp(&rb.price))
        });

        let total = matches.len();
        let results: Vec<Value> = matches
            .iter()
            .take(limit)
            .map(|(hotel, room)| hotel_summary(hotel, Some(room), nights, rooms))
            .collect();

        Ok(json!({
            "results": results,
            "total_results": total,
            "search_parameters": {
                "location": args.location,
                "check_in": args.check_in,
                "check_out": args.check_out,
                "guests": guests,
                "rooms": rooms,
            },
        }))
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct HotelDetailsArgs {
    pub hotel_id: String,
}

/// hotels.get_details：房型与政策
pub struct HotelDetailsTool;

#[async_trait]
impl Tool for HotelDetailsTool {
    fn name(&self) -> &str {
        "hotels.get_details"
    }

    fn description(&self) -> &str {
        "Get room types, amenities and policies for a hotel."
    }

    fn parameters_schema(&self) -> Value {
        schema_of::<HotelDetailsArgs>()
    }

    async fn execute(&self, args: Value, _ctx: &ToolCallContext) -> Result<Value, String> {
        let args: HotelDetailsArgs = parse_args(self.name(), args)?;
        let hotel = mock_data::find_hotel(&args.hotel_id)
            .ok_or_else(|| format!("Hotel not found: {}", args.hotel_id))?;
        let mut details = hotel_summary(&hotel, hotel.cheapest_rate(1, 1), 1, 1);
        details["city"] = json!(hotel.city);
        details["rooms"] = json!(hotel
            .rooms
            .iter()
            .map(|r| json!({ "id": r.id, "name": r.name, "capacity": r.capacity, "price": r.price }))
            .collect::<Vec<_>>());
        details["policies"] = json!({
            "check_in_time": "15:00",
            "check_out_time": "11:00",
            "cancellation": if hotel.free_cancellation {
                format!("Free cancellation up to {FREE_CANCELLATION_DAYS} days before check-in")
            } else {
                "Non-refundable".to_string()
            },
            "taxes_per_room": TAX_PER_ROOM,
        });
        Ok(details)
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct BookHotelArgs {
    pub hotel_id: String,
    pub room_type_id: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guest_name: String,
    pub email: String,
    pub phone: String,
    pub payment_method: String,
    #[serde(default)]
    pub rooms: Option<u32>,
    #[serde(default)]
    pub guests: Option<u32>,
    #[serde(default)]
    pub special_requests: Option<String>,
}

/// hotels.book
pub struct BookHotelTool {
    ledger: Arc<BookingLedger>,
}

impl BookHotelTool {
    pub fn new(ledger: Arc<BookingLedger>) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl Tool for BookHotelTool {
    fn name(&self) -> &str {
        "hotels.book"
    }

    fn description(&self) -> &str {
        "Book a room. Returns booking id, confirmation number, total price and cancellation deadline."
    }

    fn parameters_schema(&self) -> Value {
        schema_of::<BookHotelArgs>()
    }

    async fn execute(&self, args: Value, _ctx: &ToolCallContext) -> Result<Value, String> {
        let args: BookHotelArgs = parse_args(self.name(), args)?;
        for (field, value) in [
            ("guest_name", &args.guest_name),
            ("email", &args.email),
            ("phone", &args.phone),
            ("payment_method", &args.payment_method),
        ] {
            if value.trim().is_empty() {
                return Err(format!("{field} must not be empty"));
            }
        }
        let nights = nights_between(args.check_in, args.check_out)?;
        let hotel = mock_data::find_hotel(&args.hotel_id)
            .ok_or_else(|| format!("Hotel not found: {}", args.hotel_id))?;
        let room = hotel
            .rooms
            .iter()
            .find(|r| r.id == args.room_type_id)
            .ok_or_else(|| format!("Room type not found: {}", args.room_type_id))?;

        let rooms = args.rooms.unwrap_or(1).max(1);
        let room_total = room.price * f64::from(rooms) * nights as f64;
        let taxes = TAX_PER_ROOM * f64::from(rooms);
        let now = Local::now();
        let code: String = hotel.id.chars().take(4).collect::<String>().to_uppercase();
        let booking_id = format!("BOOK-{}-{code}", now.format("%Y%m%d%H%M%S"));

        let booking = self.ledger.insert(Booking {
            confirmation_number: format!("CNF-{booking_id}"),
            booking_id,
            status: "confirmed".to_string(),
            hotel_id: hotel.id.clone(),
            hotel_name: hotel.name.clone(),
            room_type_id: room.id.clone(),
            room_name: room.name.clone(),
            check_in: args.check_in,
            check_out: args.check_out,
            nights,
            rooms,
            guests: args.guests.unwrap_or(1).max(1),
            guest_name: args.guest_name,
            email: args.email,
            phone: args.phone,
            payment_method: args.payment_method,
            special_requests: args.special_requests,
            room_price: room.price,
            taxes,
            total_price: round2(room_total + taxes),
            currency: hotel.currency.clone(),
            free_cancellation_until: hotel
                .free_cancellation
                .then(|| args.check_in - Duration::days(FREE_CANCELLATION_DAYS)),
            created_at: now.to_rfc3339(),
            cancellation: None,
        });
        tracing::info!(booking_id = %booking.booking_id, hotel = %booking.hotel_id, "booking created");
        serde_json::to_value(booking).map_err(|e| e.to_string())
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CancelBookingArgs {
    pub booking_id: String,
    #[serde(default)]
    pub reason: Option<String>,
}

/// hotels.cancel_booking：截止日前取消全额退款，否则不退
pub struct CancelBookingTool {
    ledger: Arc<BookingLedger>,
}

impl CancelBookingTool {
    pub fn new(ledger: Arc<BookingLedger>) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl Tool for CancelBookingTool {
    fn name(&self) -> &str {
        "hotels.cancel_booking"
    }

    fn description(&self) -> &str {
        "Cancel a booking by id and report the refund."
    }

    fn parameters_schema(&self) -> Value {
        schema_of::<CancelBookingArgs>()
    }

    async fn execute(&self, args: Value, _ctx: &ToolCallContext) -> Result<Value, String> {
        let args: CancelBookingArgs = parse_args(self.name(), args)?;
        let reason = args
            .reason
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| "No reason provided".to_string());
        let booking = self
            .ledger
            .cancel(&args.booking_id, &reason, Local::now().date_naive())?;
        serde_json::to_value(booking).map_err(|e| e.to_string())
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct BookingDetailsArgs {
    pub booking_id: String,
}

/// hotels.get_booking_details
pub struct BookingDetailsTool {
    ledger: Arc<BookingLedger>,
}

impl BookingDetailsTool {
    pub fn new(ledger: Arc<BookingLedger>) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl Tool for BookingDetailsTool {
    fn name(&self) -> &str {
        "hotels.get_booking_details"
    }

    fn description(&self) -> &str {
        "Look up a booking by id."
    }

    fn parameters_schema(&self) -> Value {
        schema_of::<BookingDetailsArgs>()
    }

    async fn execute(&self, args: Value, _ctx: &ToolCallContext) -> Result<Value, String> {
        let args: BookingDetailsArgs = parse_args(self.name(), args)?;
        let booking = self
            .ledger
            .get(&args.booking_id)
            .ok_or_else(|| format!("Booking not found: {}", args.booking_id))?;
        serde_json::to_value(booking).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HotelOption;

    fn ctx() -> ToolCallContext {
        ToolCallContext::new("corr", "stay")
    }

    #[tokio::test]
    async fn test_search_sorts_by_rating_and_results_parse_as_hotel_options() {
        let out = HotelSearchTool
            .execute(
                json!({"location": "Paris", "check_in": "2026-05-01", "check_out": "2026-05-03", "guests": 2}),
                &ctx(),
            )
            .await
            .unwrap();
        let hotels: Vec<HotelOption> = serde_json::from_value(out["results"].clone()).unwrap();
        assert_eq!(hotels.len(), 4);
        assert_eq!(hotels[0].id, "paris_le_meurice");
        assert!(hotels.windows(2).all(|w| w[0].rating >= w[1].rating));
        assert_eq!(out["results"][0]["nights"], 2);
    }

    #[tokio::test]
    async fn test_search_applies_filters() {
        let out = HotelSearchTool
            .execute(
                json!({
                    "location": "Paris", "check_in": "2026-05-01", "check_out": "2026-05-02",
                    "price_max": 500.0, "amenities": ["restaurant"]
                }),
                &ctx(),
            )
            .await
            .unwrap();
        let ids: Vec<&str> = out["results"]
            .as_array()
            .unwrap()
            .iter()
            .map(|h| h["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["paris_regina_louvre", "paris_pullman_eiffel"]);
    }

    #[tokio::test]
    async fn test_search_rejects_reversed_dates() {
        let err = HotelSearchTool
            .execute(
                json!({"location": "Paris", "check_in": "2026-05-03", "check_out": "2026-05-01"}),
                &ctx(),
            )
            .await
            .unwrap_err();
        assert!(err.contains("check_out must be after check_in"));
    }

    #[tokio::test]
    async fn test_book_then_cancel_refunds_before_deadline() {
        let ledger = Arc::new(BookingLedger::new());
        let check_in = Local::now().date_naive() + Duration::days(30);
        let booked = BookHotelTool::new(ledger.clone())
            .execute(
                json!({
                    "hotel_id": "paris_regina_louvre", "room_type_id": "classic",
                    "check_in": check_in, "check_out": check_in + Duration::days(2),
                    "guest_name": "Ada", "email": "ada@example.com", "phone": "+33 1 00",
                    "payment_method": "card", "rooms": 2
                }),
                &ctx(),
            )
            .await
            .unwrap();
        let booking_id = booked["booking_id"].as_str().unwrap().to_string();
        assert!(booking_id.starts_with("BOOK-"));
        assert!(booking_id.ends_with("-PARI"));
        assert_eq!(booked["confirmation_number"], format!("CNF-{booking_id}"));
        assert_eq!(booked["total_price"], 420.0 * 2.0 * 2.0 + 50.0);

        let cancel = CancelBookingTool::new(ledger.clone());
        let cancelled = cancel
            .execute(json!({"booking_id": booking_id}), &ctx())
            .await
            .unwrap();
        assert_eq!(cancelled["status"], "cancelled");
        assert_eq!(cancelled["cancellation"]["reason"], "No reason provided");
        assert_eq!(cancelled["cancellation"]["refund_amount"], 1730.0);

        let again = cancel.execute(json!({"booking_id": booking_id}), &ctx()).await;
        assert!(again.unwrap_err().contains("already cancelled"));

        let details = BookingDetailsTool::new(ledger)
            .execute(json!({"booking_id": booking_id}), &ctx())
            .await
            .unwrap();
        assert_eq!(details["status"], "cancelled");
    }

    #[tokio::test]
    async fn test_unknown_booking_is_error() {
        let err = BookingDetailsTool::new(Arc::new(BookingLedger::new()))
            .execute(json!({"booking_id": "BOOK-0"}), &ctx())
            .await
            .unwrap_err();
        assert_eq!(err, "Booking not found: BOOK-0");
    }
}
