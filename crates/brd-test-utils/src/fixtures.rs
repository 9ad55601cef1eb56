//! Document fixtures

/// Three fragments of one OTP flow, no classification
pub const OTP_FLOW: &str = "User enters OTP.\nSystem validates OTP.\nIf OTP invalid, show error.";

/// Two fragments sharing "Receipt" across two sessions
pub const RECEIPT_ACROSS_SESSIONS: &str = "\
Upload Receipt
Customer uploads the Receipt photo.

Redeem Reward
Customer redeems points using a Receipt.
";

/// Page furniture and whitespace only
pub const NOISE_ONLY: &str = "\n   \nPage 1 of 2\n\n- 2 -\n\t\n";

/// A full loyalty-programme document
pub const LOYALTY_BRD: &str = "\
Loyalty Rewards Platform
Page 1 of 3

# Registration
Role: Customer
1. Customer opens the Loyalty app and selects Register.
2. Customer enters the mobile number.
3. System sends an OTP to the mobile number.
4. Customer enters the OTP.
If OTP invalid, show error and allow resend.

# Upload Receipt
Role: Customer
• Customer scans the Receipt using the camera • Customer submits the Receipt for review
Once submitted, the Receipt status shows Pending.

Role: Admin
Admin reviews the Receipt image.
If approved, credit Points to the Customer wallet.
Otherwise reject the Receipt with a reason.

# Redeem Reward
Role: Customer
Customer browses the Reward catalogue.
Customer redeems Points for a Reward.
When Points are insufficient, disable the Redeem button.

Page 2 of 3

Profile:
Customer updates the email address.
Customer uploads a profile photo.
";

/// Several short documents for batch runs
pub const BATCH: [&str; 3] = [OTP_FLOW, RECEIPT_ACROSS_SESSIONS, LOYALTY_BRD];
