use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    domain::{BookingStatus, ListingState, PaymentStatus, Role},
    dto::{
        auth::{LoginRequest, LoginResponse, RegisterRequest},
        bookings::{
            BookingList, CreateBookingRequest, PaymentFlow, PaymentOutcome, RecordPaymentRequest,
            TransitionRequest,
        },
        vehicles::{
            CreateVehicleRequest, ReviewDecision, ReviewVehicleRequest, SetActiveRequest,
            UpdateCapacityRequest, VehicleList,
        },
    },
    models::{Availability, Booking, User, Vehicle},
    response::{ApiResponse, Meta},
    routes::{admin, auth, availability, bookings, health, params, vehicles},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::login,
        auth::register,
        vehicles::list_vehicles,
        vehicles::create_vehicle,
        vehicles::get_vehicle,
        vehicles::set_active,
        vehicles::update_capacity,
        vehicles::delete_vehicle,
        availability::check_availability,
        bookings::list_my_bookings,
        bookings::create_booking,
        bookings::get_booking,
        bookings::cancel_booking,
        bookings::transition_booking,
        admin::list_all_bookings,
        admin::record_payment,
        admin::review_vehicle
    ),
    components(
        schemas(
            User,
            Vehicle,
            Booking,
            Availability,
            Role,
            BookingStatus,
            PaymentStatus,
            ListingState,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            CreateVehicleRequest,
            SetActiveRequest,
            UpdateCapacityRequest,
            ReviewDecision,
            ReviewVehicleRequest,
            VehicleList,
            CreateBookingRequest,
            PaymentFlow,
            TransitionRequest,
            PaymentOutcome,
            RecordPaymentRequest,
            BookingList,
            params::Pagination,
            params::SortOrder,
            params::VehicleQuery,
            params::BookingListQuery,
            Meta,
            ApiResponse<Vehicle>,
            ApiResponse<VehicleList>,
            ApiResponse<Booking>,
            ApiResponse<BookingList>,
            ApiResponse<Availability>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Vehicles", description = "Fleet inventory endpoints"),
        (name = "Availability", description = "Advisory availability lookup"),
        (name = "Bookings", description = "Booking lifecycle endpoints"),
        (name = "Admin", description = "Admin endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
