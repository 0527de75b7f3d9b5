pub mod currency;
pub mod executor;
pub mod expenses;
pub mod hotels;
pub mod maps;
pub mod mock_data;
pub mod registry;
pub mod reviews;
pub mod schema;

pub use currency::CurrencyConvertTool;
pub use executor::ToolExecutor;
pub use expenses::{AddExpenseTool, ExpenseLedger, GetExpensesTool};
pub use hotels::{
    BookHotelTool, BookingDetailsTool, BookingLedger, CancelBookingTool, HotelDetailsTool,
    HotelSearchTool,
};
pub use maps::{DirectionsTool, DistanceMatrixTool, PlaceDetailsTool, SearchPlacesTool};
pub use registry::{Tool, ToolCallContext, ToolDescriptor, ToolError, ToolRegistry, ToolResult};
pub use reviews::ReviewsTool;
